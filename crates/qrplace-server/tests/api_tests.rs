// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP integration tests: drive the router with `oneshot` and hand-built
// multipart bodies.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use qrplace_core::config::DEFAULT_MARKER;
use qrplace_core::{AnalysisReport, ServiceConfig};
use qrplace_document::testing::{blank_document, covered_document, marker_document};
use qrplace_server::{ErrorResponse, SignPositions, app};
use tower::util::ServiceExt;

const BOUNDARY: &str = "qrplace-test-boundary";
const QR_DATA: &str = "https://verify.example.com/c/7f3a";

fn multipart_body(file: Option<(&str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some((name, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post(router: Router, uri: &str, body: Vec<u8>) -> Response {
    router
        .oneshot(
            Request::builder()
                .uri(uri)
                .method("POST")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn error_body(response: Response) -> ErrorResponse {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn router() -> Router {
    app(ServiceConfig::default())
}

fn header_str<'a>(response: &'a Response, name: &str) -> &'a str {
    response.headers().get(name).unwrap().to_str().unwrap()
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_ok() {
    let response = router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "qrplace");
    assert!(json["version"].is_string());
}

// ---------------------------------------------------------------------------
// Detect and add
// ---------------------------------------------------------------------------

#[tokio::test]
async fn marker_document_is_stamped_at_marker() {
    let pdf = marker_document(DEFAULT_MARKER, 100.0, 104.0);
    let body = multipart_body(
        Some(("contract.pdf", &pdf)),
        &[("qr_data", QR_DATA), ("certificate_id", "CERT-7F3A")],
    );
    let response = post(router(), "/detect-and-add-qr", body).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "content-type"), "application/pdf");
    assert_eq!(
        header_str(&response, "content-disposition"),
        "attachment; filename=\"signed_contract.pdf\""
    );
    assert_eq!(header_str(&response, "x-placement-source"), "marker");
    assert_eq!(header_str(&response, "x-placement-page"), "0");
    assert!(body_bytes(response).await.starts_with(b"%PDF"));
}

#[tokio::test]
async fn blank_document_uses_empty_region() {
    let pdf = blank_document(1);
    let body = multipart_body(Some(("blank.pdf", &pdf)), &[("qr_data", QR_DATA)]);
    let response = post(router(), "/detect-and-add-qr", body).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-placement-source"), "empty_region");
}

#[tokio::test]
async fn covered_document_is_404() {
    let pdf = covered_document();
    let body = multipart_body(Some(("full.pdf", &pdf)), &[("qr_data", QR_DATA)]);
    let response = post(router(), "/detect-and-add-qr", body).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error = error_body(response).await;
    assert_eq!(error.kind, "placement_not_found");
    assert!(error.suggestion.is_some());
}

#[tokio::test]
async fn append_page_fallback_stamps_trailing_page() {
    let pdf = covered_document();
    let body = multipart_body(
        Some(("full.pdf", &pdf)),
        &[("qr_data", QR_DATA), ("fallback", "append_page")],
    );
    let response = post(router(), "/detect-and-add-qr", body).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-placement-source"), "trailing_page");
    assert_eq!(header_str(&response, "x-placement-page"), "1");
}

#[tokio::test]
async fn custom_marker_field_is_honoured() {
    let pdf = marker_document("{{QR}}", 300.0, 300.0);
    let body = multipart_body(
        Some(("custom.pdf", &pdf)),
        &[("qr_data", QR_DATA), ("marker", "{{QR}}")],
    );
    let response = post(router(), "/detect-and-add-qr", body).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-placement-source"), "marker");
}

#[tokio::test]
async fn garbage_upload_is_422() {
    let body = multipart_body(Some(("notes.pdf", b"not a pdf at all")), &[("qr_data", QR_DATA)]);
    let response = post(router(), "/detect-and-add-qr", body).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_body(response).await.kind, "invalid_document");
}

#[tokio::test]
async fn oversized_payload_is_422() {
    let pdf = blank_document(1);
    let data = "x".repeat(4000);
    let body = multipart_body(Some(("blank.pdf", &pdf)), &[("qr_data", data.as_str())]);
    let response = post(router(), "/detect-and-add-qr", body).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_body(response).await.kind, "encoding_failure");
}

#[tokio::test]
async fn missing_qr_data_is_400() {
    let pdf = blank_document(1);
    let body = multipart_body(Some(("blank.pdf", &pdf)), &[]);
    let response = post(router(), "/detect-and-add-qr", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = error_body(response).await;
    assert_eq!(error.kind, "bad_request");
    assert!(error.error.contains("qr_data"));
}

#[tokio::test]
async fn missing_file_is_400() {
    let body = multipart_body(None, &[("qr_data", QR_DATA)]);
    let response = post(router(), "/detect-and-add-qr", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_fallback_is_400() {
    let pdf = blank_document(1);
    let body = multipart_body(
        Some(("blank.pdf", &pdf)),
        &[("qr_data", QR_DATA), ("fallback", "shrug")],
    );
    let response = post(router(), "/detect-and-add-qr", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_multipart_request_is_400() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/detect-and-add-qr")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_body(response).await.kind, "bad_request");
}

#[tokio::test]
async fn upload_over_limit_is_413() {
    let config = ServiceConfig {
        max_upload_bytes: 1024,
        ..ServiceConfig::default()
    };
    let big = vec![b'%'; 8192];
    let body = multipart_body(Some(("big.pdf", &big)), &[("qr_data", QR_DATA)]);
    let response = post(app(config), "/detect-and-add-qr", body).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(error_body(response).await.kind, "payload_too_large");
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[tokio::test]
async fn analyze_reports_marker_candidates() {
    let pdf = marker_document(DEFAULT_MARKER, 100.0, 104.0);
    let body = multipart_body(Some(("contract.pdf", &pdf)), &[]);
    let response = post(router(), "/analyze", body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let report: AnalysisReport = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(report.marker_found);
    assert_eq!(report.page_count, 1);
    assert_eq!(report.candidate_regions.len(), 1);
    assert_eq!(report.document_digest.len(), 64);
}

#[tokio::test]
async fn sign_positions_are_raw_marker_boxes() {
    let pdf = marker_document(DEFAULT_MARKER, 100.0, 104.0);
    let body = multipart_body(Some(("contract.pdf", &pdf)), &[]);
    let response = post(router(), "/detect-sign-positions", body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = body_bytes(response).await;
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["positions"].is_array());
    assert!(json.get("candidate_regions").is_none());

    let found: SignPositions = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(found.positions.len(), 1);
    let position = found.positions[0];
    assert_eq!(position.page, 0);
    assert!((position.x - 100.0).abs() < 1e-3);
    assert!(position.width < 96.0 && position.height < 20.0);
}

#[tokio::test]
async fn sign_positions_without_marker_is_empty_list() {
    let pdf = blank_document(1);
    let body = multipart_body(Some(("blank.pdf", &pdf)), &[]);
    let response = post(router(), "/detect-sign-positions", body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let found: SignPositions = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(found.positions.is_empty());
}

#[tokio::test]
async fn analyze_without_marker_lists_empty_regions() {
    let pdf = blank_document(2);
    let body = multipart_body(Some(("blank.pdf", &pdf)), &[]);
    let response = post(router(), "/analyze", body).await;

    let report: AnalysisReport = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(!report.marker_found);
    assert_eq!(report.page_count, 2);
    assert_eq!(report.candidate_regions.len(), 2);
    assert_eq!(report.candidate_regions[1].page, 1);
}

// ---------------------------------------------------------------------------
// Explicit regions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_qr_codes_stamps_explicit_region() {
    let pdf = blank_document(1);
    let positions = r#"[{"page":0,"x":400.0,"y":50.0,"width":120.0,"height":120.0}]"#;
    let body = multipart_body(
        Some(("deal.pdf", &pdf)),
        &[("positions_json", positions), ("qr_data", QR_DATA), ("certificate_id", "C-1")],
    );
    let response = post(router(), "/add-qr-codes", body).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_str(&response, "content-disposition"),
        "attachment; filename=\"signed_deal.pdf\""
    );
    assert!(body_bytes(response).await.starts_with(b"%PDF"));
}

#[tokio::test]
async fn add_qr_codes_fills_in_missing_size() {
    let pdf = blank_document(1);
    let positions = r#"[{"page":0,"x":400,"y":50}]"#;
    let body = multipart_body(
        Some(("deal.pdf", &pdf)),
        &[("positions_json", positions), ("qr_data", QR_DATA)],
    );
    let response = post(router(), "/add-qr-codes", body).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response).await.starts_with(b"%PDF"));
}

#[tokio::test]
async fn add_qr_codes_rejects_missing_page() {
    let pdf = blank_document(1);
    let positions = r#"[{"page":5,"x":10.0,"y":10.0,"width":100.0,"height":100.0}]"#;
    let body = multipart_body(
        Some(("deal.pdf", &pdf)),
        &[("positions_json", positions), ("qr_data", QR_DATA)],
    );
    let response = post(router(), "/add-qr-codes", body).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_body(response).await.kind, "invalid_region");
}

#[tokio::test]
async fn add_qr_codes_rejects_malformed_positions() {
    let pdf = blank_document(1);
    let body = multipart_body(
        Some(("deal.pdf", &pdf)),
        &[("positions_json", "{not json"), ("qr_data", QR_DATA)],
    );
    let response = post(router(), "/add-qr-codes", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

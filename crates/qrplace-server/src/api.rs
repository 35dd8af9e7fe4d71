// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Router and request handlers.
//
// Handlers only parse multipart forms and shape responses. All PDF work runs
// on the blocking pool through the qrplace-document pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderName, HeaderValue, Method, Request, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use qrplace_core::config::CorsConfig;
use qrplace_core::{AnalysisReport, Fallback, PlacementRegion, QrPayload, Rect, ServiceConfig};
use qrplace_document::{StampOptions, pipeline};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::AppError;

const PLACEMENT_PAGE: HeaderName = HeaderName::from_static("x-placement-page");
const PLACEMENT_SOURCE: HeaderName = HeaderName::from_static("x-placement-source");

/// Shared, read-only router state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

// -- Router ----------------------------------------------------------------------

/// Build the application router with all routes configured.
pub fn app(config: ServiceConfig) -> Router {
    let state = AppState::new(config);
    let cors = cors_layer(&state.config.cors);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route("/detect-and-add-qr", post(detect_and_add_qr))
        .route("/analyze", post(analyze))
        .route("/detect-sign-positions", post(detect_sign_positions))
        .route("/add-qr-codes", post(add_qr_codes))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(cors)
        .with_state(state)
}

fn request_span(request: &Request<Body>) -> Span {
    info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %Uuid::new_v4(),
    )
}

/// CORS from configuration. A `*` entry means any; with credentials enabled
/// the request's own origin, method, or headers are echoed back instead.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let credentials = config.allow_credentials;

    let origins = if is_wildcard(&config.allowed_origins) {
        if credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::from(Any)
        }
    } else {
        AllowOrigin::list(config.allowed_origins.iter().filter_map(|origin| {
            HeaderValue::from_str(origin.trim())
                .map_err(|err| warn!(%origin, %err, "Ignoring invalid CORS origin"))
                .ok()
        }))
    };

    let methods = if is_wildcard(&config.allowed_methods) {
        if credentials {
            AllowMethods::mirror_request()
        } else {
            AllowMethods::from(Any)
        }
    } else {
        AllowMethods::list(config.allowed_methods.iter().filter_map(|method| {
            Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
                .map_err(|err| warn!(%method, %err, "Ignoring invalid CORS method"))
                .ok()
        }))
    };

    let headers = if is_wildcard(&config.allowed_headers) {
        if credentials {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::from(Any)
        }
    } else {
        AllowHeaders::list(config.allowed_headers.iter().filter_map(|name| {
            HeaderName::from_bytes(name.trim().as_bytes())
                .map_err(|err| warn!(%name, %err, "Ignoring invalid CORS header"))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(credentials)
        .expose_headers([header::CONTENT_DISPOSITION, PLACEMENT_PAGE, PLACEMENT_SOURCE])
}

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|value| value.trim() == "*")
}

// -- Multipart forms -------------------------------------------------------------

#[derive(Debug)]
struct Upload {
    file_name: Option<String>,
    data: Vec<u8>,
}

/// The `file` part plus every other field as text.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Upload>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(multipart: Result<Multipart, MultipartRejection>) -> Result<Self, AppError> {
        let mut multipart = multipart.map_err(|rejection| {
            AppError::BadRequest(format!("expected multipart/form-data: {}", rejection.body_text()))
        })?;

        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let file_name = field.file_name().map(str::to_owned);
                let data = field.bytes().await?.to_vec();
                debug!(bytes = data.len(), ?file_name, "Received upload");
                form.file = Some(Upload { file_name, data });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    fn take_file(&mut self) -> Result<Upload, AppError> {
        self.file
            .take()
            .ok_or_else(|| AppError::BadRequest("missing `file` field".into()))
    }

    fn required(&mut self, name: &str) -> Result<String, AppError> {
        self.fields
            .remove(name)
            .ok_or_else(|| AppError::BadRequest(format!("missing `{name}` field")))
    }

    /// A present, non-blank field.
    fn optional(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name).filter(|value| !value.trim().is_empty())
    }

    fn marker(&mut self, config: &ServiceConfig) -> String {
        self.optional("marker")
            .unwrap_or_else(|| config.default_marker.clone())
    }

    fn payload(&mut self) -> Result<QrPayload, AppError> {
        let data = self.required("qr_data")?;
        let payload = QrPayload::new(data);
        Ok(match self.optional("certificate_id") {
            Some(id) => payload.with_certificate_id(id),
            None => payload,
        })
    }
}

// -- Request and response bodies ---------------------------------------------------

/// One entry of `positions_json`. Omitted fields take the defaults of the
/// legacy signing form: page 0 at (50, 50), 120x120pt.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PositionInput {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_offset")]
    pub x: f64,
    #[serde(default = "default_offset")]
    pub y: f64,
    #[serde(default = "default_extent")]
    pub width: f64,
    #[serde(default = "default_extent")]
    pub height: f64,
}

fn default_offset() -> f64 {
    50.0
}

fn default_extent() -> f64 {
    120.0
}

impl From<PositionInput> for PlacementRegion {
    fn from(input: PositionInput) -> Self {
        PlacementRegion::new(
            input.page,
            Rect::new(input.x, input.y, input.width, input.height),
        )
    }
}

/// Body of `/detect-sign-positions`: raw marker boxes in PDF user space
/// (points, origin at the bottom-left of the page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignPositions {
    pub positions: Vec<PlacementRegion>,
}

// -- Handlers --------------------------------------------------------------------

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "qrplace",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Locate a placement, stamp the QR, and return the signed PDF.
pub async fn detect_and_add_qr(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let upload = form.take_file()?;
    let marker = form.marker(&state.config);
    let payload = form.payload()?;
    let fallback = match form.optional("fallback") {
        Some(value) => value.parse::<Fallback>().map_err(AppError::BadRequest)?,
        None => Fallback::default(),
    };
    let options = StampOptions { fallback };

    let config = Arc::clone(&state.config);
    let data = upload.data;
    let outcome = tokio::task::spawn_blocking(move || {
        pipeline::detect_and_add_qr(&data, &marker, &payload, &options, &config.placement)
    })
    .await??;

    info!(
        page = outcome.region.page,
        source = outcome.source.as_str(),
        bytes = outcome.pdf.len(),
        "Stamped document"
    );

    let mut response = pdf_response(upload.file_name.as_deref(), outcome.pdf)?;
    let headers = response.headers_mut();
    headers.insert(PLACEMENT_PAGE, HeaderValue::from(outcome.region.page));
    headers.insert(
        PLACEMENT_SOURCE,
        HeaderValue::from_static(outcome.source.as_str()),
    );
    Ok(response)
}

/// Report candidate regions without modifying the document.
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisReport>, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let upload = form.take_file()?;
    let marker = form.marker(&state.config);

    let config = Arc::clone(&state.config);
    let report = tokio::task::spawn_blocking(move || {
        pipeline::analyze_pdf(&upload.data, &marker, &config.placement)
    })
    .await??;

    info!(
        candidates = report.candidate_regions.len(),
        marker_found = report.marker_found,
        "Analysed document"
    );
    Ok(Json(report))
}

/// Every marker occurrence, unpadded, in document order.
pub async fn detect_sign_positions(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SignPositions>, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let upload = form.take_file()?;
    let marker = form.marker(&state.config);

    let positions = tokio::task::spawn_blocking(move || {
        pipeline::marker_positions(&upload.data, &marker)
    })
    .await??;

    info!(positions = positions.len(), "Located markers");
    Ok(Json(SignPositions { positions }))
}

/// Stamp the QR at caller-supplied regions.
pub async fn add_qr_codes(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let upload = form.take_file()?;
    let positions = form.required("positions_json")?;
    let regions: Vec<PlacementRegion> = serde_json::from_str::<Vec<PositionInput>>(&positions)
        .map_err(|err| AppError::BadRequest(format!("`positions_json` is not a list of regions: {err}")))?
        .into_iter()
        .map(PlacementRegion::from)
        .collect();
    let payload = form.payload()?;

    let config = Arc::clone(&state.config);
    let data = upload.data;
    let pdf = tokio::task::spawn_blocking(move || {
        pipeline::add_qr_at(&data, &regions, &payload, &config.placement)
    })
    .await??;

    pdf_response(upload.file_name.as_deref(), pdf)
}

// -- Responses -------------------------------------------------------------------

fn pdf_response(file_name: Option<&str>, pdf: Vec<u8>) -> Result<Response, AppError> {
    let disposition = format!("attachment; filename=\"signed_{}\"", safe_file_name(file_name));
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|err| AppError::Internal(format!("bad Content-Disposition: {err}")))?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}

/// Base name of the upload restricted to characters safe inside a quoted
/// header parameter.
fn safe_file_name(file_name: Option<&str>) -> String {
    let base = file_name
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("document.pdf");
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

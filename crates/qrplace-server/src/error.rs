// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP error responses.
//
// Core errors are rendered through `humanize_error` so callers get a plain
// message, a stable `kind`, and a suggestion. Request-shape problems that
// never reach the core carry their own kinds.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use qrplace_core::error::ErrorKind;
use qrplace_core::human_errors::humanize_error;
use qrplace_core::QrPlaceError;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Plain-language summary.
    pub error: String,
    /// Machine-readable kind, e.g. `placement_not_found`.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Technical detail from the underlying error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum AppError {
    /// Failure reported by the stamping core.
    Core(QrPlaceError),
    /// Malformed request: missing field, bad multipart, unparseable value.
    BadRequest(String),
    /// Upload larger than the configured body limit.
    PayloadTooLarge(String),
    /// Worker panicked or was cancelled.
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Core(err) => status_for(err.kind()),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            Self::Core(err) => {
                let human = humanize_error(err);
                ErrorResponse {
                    error: human.message,
                    kind: human.kind.as_str().to_string(),
                    suggestion: Some(human.suggestion),
                    detail: Some(err.to_string()),
                }
            }
            Self::BadRequest(detail) => ErrorResponse {
                error: detail.clone(),
                kind: "bad_request".into(),
                suggestion: Some(
                    "Send multipart/form-data with a `file` field and the documented form fields."
                        .into(),
                ),
                detail: None,
            },
            Self::PayloadTooLarge(detail) => ErrorResponse {
                error: "The uploaded file is too large.".into(),
                kind: "payload_too_large".into(),
                suggestion: Some("Upload a smaller PDF.".into()),
                detail: Some(detail.clone()),
            },
            Self::Internal(detail) => ErrorResponse {
                error: "The service had an internal problem.".into(),
                kind: ErrorKind::Internal.as_str().into(),
                suggestion: Some("Try again. If this keeps happening, please report it.".into()),
                detail: Some(detail.clone()),
            },
        }
    }
}

/// HTTP status for a core error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::PlacementNotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidDocument
        | ErrorKind::RegionTooSmall
        | ErrorKind::InvalidRegion
        | ErrorKind::EncodingFailure => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InvalidConfig | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();
        if status.is_server_error() {
            error!(status = status.as_u16(), kind = %body.kind, detail = ?body.detail, "Request failed");
        } else {
            warn!(status = status.as_u16(), kind = %body.kind, "Request rejected");
        }
        (status, Json(body)).into_response()
    }
}

impl From<QrPlaceError> for AppError {
    fn from(err: QrPlaceError) -> Self {
        AppError::Core(err)
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(format!("failed to read multipart body: {}", err.body_text()))
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("stamping task failed: {err}"))
    }
}

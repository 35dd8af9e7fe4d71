// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// qrplace-server — axum front end for the QR stamping pipeline.

pub mod api;
pub mod error;

pub use api::{AppState, PositionInput, SignPositions, app, cors_layer};
pub use error::{AppError, ErrorResponse};

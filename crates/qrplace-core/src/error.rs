// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for qrplace.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all qrplace operations.
///
/// Every variant is terminal for the request that produced it. The stamping
/// pipeline is deterministic, so nothing here is ever retried internally.
#[derive(Debug, Error)]
pub enum QrPlaceError {
    // -- Document errors --
    #[error("invalid PDF document: {0}")]
    InvalidDocument(String),

    // -- Placement errors --
    #[error("no placement found: {0}")]
    PlacementNotFound(String),

    #[error("region {width:.1}x{height:.1}pt is smaller than the minimum of {minimum:.1}pt")]
    RegionTooSmall {
        width: f64,
        height: f64,
        minimum: f64,
    },

    #[error("invalid placement region: {0}")]
    InvalidRegion(String),

    // -- QR errors --
    #[error("QR encoding failed: {0}")]
    EncodingFailure(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Machine-readable classification of a [`QrPlaceError`].
///
/// This is the stable value the HTTP layer puts in the `kind` field of its
/// error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidDocument,
    PlacementNotFound,
    RegionTooSmall,
    InvalidRegion,
    EncodingFailure,
    InvalidConfig,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidDocument => "invalid_document",
            Self::PlacementNotFound => "placement_not_found",
            Self::RegionTooSmall => "region_too_small",
            Self::InvalidRegion => "invalid_region",
            Self::EncodingFailure => "encoding_failure",
            Self::InvalidConfig => "invalid_config",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl QrPlaceError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDocument(_) => ErrorKind::InvalidDocument,
            Self::PlacementNotFound(_) => ErrorKind::PlacementNotFound,
            Self::RegionTooSmall { .. } => ErrorKind::RegionTooSmall,
            Self::InvalidRegion(_) => ErrorKind::InvalidRegion,
            Self::EncodingFailure(_) => ErrorKind::EncodingFailure,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::Io(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, QrPlaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_snake_case_on_the_wire() {
        let json = serde_json::to_string(&ErrorKind::PlacementNotFound).unwrap();
        assert_eq!(json, "\"placement_not_found\"");
        assert_eq!(ErrorKind::RegionTooSmall.as_str(), "region_too_small");
    }

    #[test]
    fn region_too_small_message_names_dimensions() {
        let err = QrPlaceError::RegionTooSmall {
            width: 20.0,
            height: 30.0,
            minimum: 48.0,
        };
        assert_eq!(err.kind(), ErrorKind::RegionTooSmall);
        assert_eq!(
            err.to_string(),
            "region 20.0x30.0pt is smaller than the minimum of 48.0pt"
        );
    }

    #[test]
    fn io_errors_are_internal() {
        let err: QrPlaceError = std::io::Error::other("disk gone").into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}

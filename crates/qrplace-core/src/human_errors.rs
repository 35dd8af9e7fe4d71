// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for callers of the stamping service.
//
// Every technical error is mapped to plain English with a clear suggestion,
// so the signing application in front of us can show something useful to its
// own users without knowing PDF internals.

use crate::error::{ErrorKind, QrPlaceError};

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Machine-readable kind, mirrored from the source error.
    pub kind: ErrorKind,
    /// Plain English summary.
    pub message: String,
    /// What the caller should try next.
    pub suggestion: String,
}

/// Convert a `QrPlaceError` into a `HumanError`.
pub fn humanize_error(err: &QrPlaceError) -> HumanError {
    let kind = err.kind();
    match err {
        QrPlaceError::InvalidDocument(detail) => HumanError {
            kind,
            message: "The uploaded file is not a readable PDF.".into(),
            suggestion: format!(
                "Check that the upload is a complete, unencrypted PDF with at least one page. ({detail})"
            ),
        },

        QrPlaceError::PlacementNotFound(_) => HumanError {
            kind,
            message: "There is no room for the verification QR code.".into(),
            suggestion: "Add the marker text (for example [[SIGN_HERE]]) where the QR code should go, or request the append_page fallback to add a trailing page.".into(),
        },

        QrPlaceError::RegionTooSmall { minimum, .. } => HumanError {
            kind,
            message: "The chosen area is too small for a scannable QR code.".into(),
            suggestion: format!(
                "Use an area of at least {minimum:.0}x{minimum:.0} points, or shorten the QR payload."
            ),
        },

        QrPlaceError::InvalidRegion(detail) => HumanError {
            kind,
            message: "The requested position is not on the document.".into(),
            suggestion: format!("Check the page number and coordinates. ({detail})"),
        },

        QrPlaceError::EncodingFailure(_) => HumanError {
            kind,
            message: "The QR data could not be encoded.".into(),
            suggestion: "Shorten the verification URL; QR codes with high error correction hold about 1200 bytes.".into(),
        },

        QrPlaceError::InvalidConfig(detail) => HumanError {
            kind,
            message: "The service is misconfigured.".into(),
            suggestion: format!("Fix the placement settings and restart the service. ({detail})"),
        },

        QrPlaceError::Io(_) | QrPlaceError::Serialization(_) => HumanError {
            kind,
            message: "The service had an internal problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_not_found_mentions_marker() {
        let err = QrPlaceError::PlacementNotFound("no free area on 3 pages".into());
        let human = humanize_error(&err);
        assert_eq!(human.kind, ErrorKind::PlacementNotFound);
        assert!(human.suggestion.contains("[[SIGN_HERE]]"));
    }

    #[test]
    fn region_too_small_reports_minimum() {
        let err = QrPlaceError::RegionTooSmall {
            width: 10.0,
            height: 10.0,
            minimum: 48.0,
        };
        let human = humanize_error(&err);
        assert!(human.suggestion.contains("48x48"));
    }

    #[test]
    fn invalid_document_keeps_detail() {
        let err = QrPlaceError::InvalidDocument("no trailer".into());
        let human = humanize_error(&err);
        assert_eq!(human.kind, ErrorKind::InvalidDocument);
        assert!(human.suggestion.contains("no trailer"));
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// qrplace-document — PDF layout extraction, QR placement, and compositing.
//
// Provides the page layout model and content-stream interpreter, the marker
// locator and empty-region finder, QR symbol generation, the compositor that
// draws stamps onto pages, and the pipeline operations built from them.

pub mod image;
pub mod pdf;
pub mod pipeline;
pub mod placement;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod testing;

// Re-export the primary entry points so callers can use `qrplace_document::analyze_pdf` etc.
pub use image::{QrEncoder, QrSymbol};
pub use pdf::layout::{DocumentLayout, PageLayout, TextRun};
pub use pdf::reader::PdfReader;
pub use pdf::writer::Compositor;
pub use pipeline::{
    StampOptions, StampOutcome, add_qr_at, analyze_pdf, detect_and_add_qr, marker_positions,
};
pub use placement::{find_all_markers, find_empty_region, locate_marker};

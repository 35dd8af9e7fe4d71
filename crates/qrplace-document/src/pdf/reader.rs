// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — parse uploaded bytes with `lopdf`, resolve page geometry, and
// extract the per-page layout used by the placement heuristics.
//
// Placement works inside a page's visible area: the CropBox clipped to the
// MediaBox, or the MediaBox alone when no usable CropBox exists.

use lopdf::{Document, ObjectId};
use qrplace_core::error::QrPlaceError;
use qrplace_core::Rect;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use super::content::{self, inherited, number, resolve};
use super::layout::{DocumentLayout, PageLayout};

/// US Letter, used when no MediaBox can be found anywhere up the page tree.
pub const DEFAULT_MEDIA_BOX: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 612.0,
    height: 792.0,
};

/// A parsed, unencrypted PDF with at least one page.
#[derive(Debug, Clone)]
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Page object ids in document order.
    page_ids: Vec<ObjectId>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Parse a PDF from raw bytes.
    ///
    /// Fails with `InvalidDocument` when the bytes do not parse, the document
    /// is encrypted, or it has no pages.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, QrPlaceError> {
        let document = Document::load_mem(data).map_err(|err| {
            QrPlaceError::InvalidDocument(format!("failed to parse PDF: {err}"))
        })?;

        if document.is_encrypted() {
            return Err(QrPlaceError::InvalidDocument(
                "encrypted PDFs are not supported".to_string(),
            ));
        }

        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(QrPlaceError::InvalidDocument(
                "PDF has no pages".to_string(),
            ));
        }

        debug!(pages = page_ids.len(), "PDF loaded from bytes");
        Ok(Self { document, page_ids })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn page_ids(&self) -> &[ObjectId] {
        &self.page_ids
    }

    /// Object id of the zero-based page `index`.
    pub fn page_id(&self, index: usize) -> Result<ObjectId, QrPlaceError> {
        self.page_ids.get(index).copied().ok_or_else(|| {
            QrPlaceError::InvalidRegion(format!(
                "page {index} out of range (document has {} pages)",
                self.page_ids.len()
            ))
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// The effective MediaBox of page `index`, normalised so that width and
    /// height are positive.
    pub fn media_box(&self, index: usize) -> Result<Rect, QrPlaceError> {
        let page_id = self.page_id(index)?;
        Ok(page_box_of(&self.document, page_id, b"MediaBox").unwrap_or_else(|| {
            warn!(page = index, "No usable MediaBox; assuming US Letter");
            DEFAULT_MEDIA_BOX
        }))
    }

    /// The visible area of page `index`: its CropBox intersected with the
    /// MediaBox. Falls back to the MediaBox when there is no CropBox or the
    /// two do not overlap.
    pub fn page_bounds(&self, index: usize) -> Result<Rect, QrPlaceError> {
        let page_id = self.page_id(index)?;
        let media_box = self.media_box(index)?;
        let Some(crop_box) = page_box_of(&self.document, page_id, b"CropBox") else {
            return Ok(media_box);
        };
        Ok(crop_box.intersection(&media_box).unwrap_or_else(|| {
            warn!(page = index, ?crop_box, "CropBox lies outside the MediaBox; ignoring it");
            media_box
        }))
    }

    // -- Layout ---------------------------------------------------------------

    /// Extract the layout of a single page.
    pub fn page_layout(&self, index: usize) -> Result<PageLayout, QrPlaceError> {
        let page_id = self.page_id(index)?;
        let bounds = self.page_bounds(index)?;
        Ok(content::interpret_page(&self.document, page_id, index, bounds))
    }

    /// Extract the layout of every page, in document order.
    #[instrument(skip(self), fields(pages = self.page_count()))]
    pub fn layout(&self) -> Result<DocumentLayout, QrPlaceError> {
        let pages = (0..self.page_count())
            .map(|index| self.page_layout(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DocumentLayout { pages })
    }
}

/// Hex SHA-256 of a byte slice.
pub fn digest_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// A page box (`MediaBox`, `CropBox`, ...) resolved up the page tree.
pub(crate) fn page_box_of(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Rect> {
    let array = resolve(doc, inherited(doc, page_id, key)?)?
        .as_array()
        .ok()?;
    let values: Vec<f64> = array
        .iter()
        .map(|v| resolve(doc, v).and_then(number))
        .collect::<Option<_>>()?;
    match values.as_slice() {
        [x0, y0, x1, y1] => {
            let rect = Rect::from_corners(*x0, *y0, *x1, *y1);
            (rect.width > 0.0 && rect.height > 0.0).then_some(rect)
        }
        _ => None,
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline — the document operations exposed to callers: detect-and-stamp,
// analyse (detection only), raw marker positions, and stamp at explicit
// regions.
//
// Each call owns its `lopdf::Document`; on any error it is dropped and no
// bytes are returned.

use qrplace_core::config::PlacementConfig;
use qrplace_core::error::{QrPlaceError, Result};
use qrplace_core::{
    AnalysisReport, Fallback, Placement, PlacementRegion, PlacementSource, QrPayload, Rect,
};
use tracing::{debug, info, instrument, warn};

use crate::image::{QrEncoder, QrSymbol};
use crate::pdf::layout::PageLayout;
use crate::pdf::reader::{PdfReader, digest_hex};
use crate::pdf::writer::{Compositor, append_blank_page, save_to_bytes};
use crate::placement::marker::padded_marker_box;
use crate::placement::{
    best_region_on_page, find_all_markers, find_empty_region, find_first_marker, layout_stamp,
    marker_region,
};

/// Per-request options for [`detect_and_add_qr`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StampOptions {
    pub fallback: Fallback,
}

/// Result of a successful stamp.
#[derive(Debug, Clone)]
pub struct StampOutcome {
    /// The modified PDF.
    pub pdf: Vec<u8>,
    pub region: PlacementRegion,
    pub source: PlacementSource,
}

// -- Detect and stamp -------------------------------------------------------------

/// Find where the QR goes and draw it there.
///
/// Order: parse, encode the QR, search for the marker, search for an empty
/// region, apply the fallback, composite, serialise.
#[instrument(skip_all, fields(pdf_len = pdf.len(), marker = %marker, fallback = ?options.fallback))]
pub fn detect_and_add_qr(
    pdf: &[u8],
    marker: &str,
    payload: &QrPayload,
    options: &StampOptions,
    config: &PlacementConfig,
) -> Result<StampOutcome> {
    config.validate()?;
    let reader = PdfReader::from_bytes(pdf)?;
    let symbol = QrEncoder::from_config(config).encode(&payload.data)?;
    let layout = reader.layout()?;
    let min = config.min_region_size;

    let marker_hit = find_first_marker(&layout, marker).and_then(|hit| {
        let rect = marker_region(&layout.pages[hit.page], &hit.bbox, config);
        if rect.is_none() {
            warn!(page = hit.page, "Marker page too small for a QR region; searching for free space");
        }
        rect.map(|rect| (hit, rect))
    });

    let (region, source, cover) = if let Some((hit, rect)) = marker_hit {
        let region = PlacementRegion::new(hit.page, rect);
        let cover = config
            .cover_marker
            .then(|| padded_marker_box(&hit.bbox, config));
        (region, PlacementSource::Marker, cover)
    } else {
        match find_empty_region(&layout.pages, min, min, config) {
            Placement::Found(region) => (region, PlacementSource::EmptyRegion, None),
            Placement::NotFound => match options.fallback {
                Fallback::Fail => {
                    return Err(QrPlaceError::PlacementNotFound(format!(
                        "no '{marker}' marker and no free {min:.0}x{min:.0}pt region on any of {} pages",
                        layout.page_count()
                    )));
                }
                Fallback::AppendPage => {
                    return stamp_on_trailing_page(reader, payload, &symbol, config);
                }
            },
        }
    };

    let page_id = reader.page_id(region.page)?;
    let stamp = layout_stamp(&region.rect(), &symbol, payload, config)?;
    let mut doc = reader.into_document();
    Compositor::new(&symbol).stamp(&mut doc, page_id, &stamp, cover)?;
    let pdf = save_to_bytes(&mut doc)?;

    info!(
        page = region.page,
        source = source.as_str(),
        output_bytes = pdf.len(),
        "QR stamped"
    );
    Ok(StampOutcome {
        pdf,
        region,
        source,
    })
}

fn stamp_on_trailing_page(
    reader: PdfReader,
    payload: &QrPayload,
    symbol: &QrSymbol,
    config: &PlacementConfig,
) -> Result<StampOutcome> {
    let index = reader.page_count();
    // The new page takes the visible size of the last page.
    let page_box = reader.page_bounds(index - 1)?;
    let mut doc = reader.into_document();
    let page_id = append_blank_page(&mut doc, page_box)?;

    let min = config.min_region_size;
    let blank = PageLayout::new(index, page_box);
    let Some(rect) = best_region_on_page(&blank, min, min, config) else {
        return Err(QrPlaceError::PlacementNotFound(format!(
            "appended page of {:.0}x{:.0}pt has no free {min:.0}x{min:.0}pt region",
            page_box.width, page_box.height
        )));
    };
    let region = PlacementRegion::new(index, rect);

    let stamp = layout_stamp(&rect, symbol, payload, config)?;
    Compositor::new(symbol).stamp(&mut doc, page_id, &stamp, None)?;
    let pdf = save_to_bytes(&mut doc)?;

    info!(page = index, output_bytes = pdf.len(), "QR stamped on appended page");
    Ok(StampOutcome {
        pdf,
        region,
        source: PlacementSource::TrailingPage,
    })
}

// -- Analysis ---------------------------------------------------------------------

/// Detection only: where would the QR go?
///
/// When the first marker yields a region, every marker region that fits its
/// page, in document order; otherwise the best empty region of each
/// qualifying page in page order.
#[instrument(skip_all, fields(pdf_len = pdf.len(), marker = %marker))]
pub fn analyze_pdf(pdf: &[u8], marker: &str, config: &PlacementConfig) -> Result<AnalysisReport> {
    config.validate()?;
    let reader = PdfReader::from_bytes(pdf)?;
    let layout = reader.layout()?;
    let min = config.min_region_size;

    let hits = find_all_markers(&layout, marker);
    let marker_found = !hits.is_empty();
    let marker_regions: Vec<Option<PlacementRegion>> = hits
        .iter()
        .map(|hit| {
            marker_region(&layout.pages[hit.page], &hit.bbox, config)
                .map(|rect| PlacementRegion::new(hit.page, rect))
        })
        .collect();
    let candidate_regions: Vec<PlacementRegion> = if matches!(marker_regions.first(), Some(Some(_))) {
        marker_regions.into_iter().flatten().collect()
    } else {
        layout
            .pages
            .iter()
            .filter_map(|page| {
                best_region_on_page(page, min, min, config)
                    .map(|rect| PlacementRegion::new(page.index, rect))
            })
            .collect()
    };

    debug!(
        marker_found,
        candidates = candidate_regions.len(),
        "Analysis complete"
    );
    Ok(AnalysisReport {
        candidate_regions,
        marker_found,
        page_count: layout.page_count(),
        document_digest: digest_hex(pdf),
    })
}

// -- Marker positions -------------------------------------------------------------

/// The unpadded box of every marker occurrence, in document order and PDF
/// user space.
#[instrument(skip_all, fields(pdf_len = pdf.len(), marker = %marker))]
pub fn marker_positions(pdf: &[u8], marker: &str) -> Result<Vec<PlacementRegion>> {
    let reader = PdfReader::from_bytes(pdf)?;
    let layout = reader.layout()?;
    Ok(find_all_markers(&layout, marker)
        .into_iter()
        .map(|hit| PlacementRegion::new(hit.page, hit.bbox))
        .collect())
}

// -- Explicit regions -------------------------------------------------------------

/// Stamp the QR at each caller-supplied region.
#[instrument(skip_all, fields(pdf_len = pdf.len(), regions = regions.len()))]
pub fn add_qr_at(
    pdf: &[u8],
    regions: &[PlacementRegion],
    payload: &QrPayload,
    config: &PlacementConfig,
) -> Result<Vec<u8>> {
    config.validate()?;
    if regions.is_empty() {
        return Err(QrPlaceError::InvalidRegion(
            "at least one region is required".to_string(),
        ));
    }
    let reader = PdfReader::from_bytes(pdf)?;
    let symbol = QrEncoder::from_config(config).encode(&payload.data)?;

    let mut stamps = Vec::with_capacity(regions.len());
    for region in regions {
        let page_id = reader.page_id(region.page)?;
        let rect = region.rect();
        validate_explicit(&rect, &reader.page_bounds(region.page)?, region.page)?;
        stamps.push((page_id, layout_stamp(&rect, &symbol, payload, config)?));
    }

    let mut doc = reader.into_document();
    let mut compositor = Compositor::new(&symbol);
    for (page_id, stamp) in &stamps {
        compositor.stamp(&mut doc, *page_id, stamp, None)?;
    }
    let pdf = save_to_bytes(&mut doc)?;

    info!(stamps = stamps.len(), output_bytes = pdf.len(), "QR stamped at explicit regions");
    Ok(pdf)
}

fn validate_explicit(rect: &Rect, bounds: &Rect, page: usize) -> Result<()> {
    let finite = [rect.x, rect.y, rect.width, rect.height]
        .iter()
        .all(|v| v.is_finite());
    if !finite || rect.width < 0.0 || rect.height < 0.0 {
        return Err(QrPlaceError::InvalidRegion(format!(
            "region on page {page} has invalid geometry: {rect:?}"
        )));
    }
    if !bounds.contains(rect) {
        warn!(page, ?rect, ?bounds, "Explicit region leaves the page");
        return Err(QrPlaceError::InvalidRegion(format!(
            "region ({:.1}, {:.1}, {:.1}x{:.1}) lies outside page {page} ({:.0}x{:.0}pt)",
            rect.x, rect.y, rect.width, rect.height, bounds.width, bounds.height
        )));
    }
    Ok(())
}

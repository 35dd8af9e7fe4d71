// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Marker locator — exact, case-sensitive search for a literal marker string
// in the text layer.
//
// Runs shown inside one `BT … ET` text object are joined without a separator
// before searching, so a marker emitted as several `Tj` fragments (or as one
// `TJ` array with kerning) is still found. Runs from different text objects
// are never joined.

use qrplace_core::config::PlacementConfig;
use qrplace_core::{Placement, PlacementRegion, Rect};
use tracing::{debug, instrument};

use crate::pdf::layout::{DocumentLayout, PageLayout, TextRun};

/// One occurrence of the marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerHit {
    /// Zero-based page index.
    pub page: usize,
    /// Union of the boxes of the matched characters, unpadded.
    pub bbox: Rect,
}

/// Every non-overlapping occurrence of `marker`, in document order.
#[instrument(skip(layout), fields(pages = layout.page_count()))]
pub fn find_all_markers(layout: &DocumentLayout, marker: &str) -> Vec<MarkerHit> {
    let hits: Vec<MarkerHit> = layout
        .pages
        .iter()
        .flat_map(|page| page_hits(page, marker, usize::MAX))
        .collect();
    debug!(hits = hits.len(), "Marker scan complete");
    hits
}

/// The first occurrence of `marker`; later pages are not scanned.
pub fn find_first_marker(layout: &DocumentLayout, marker: &str) -> Option<MarkerHit> {
    layout
        .pages
        .iter()
        .find_map(|page| page_hits(page, marker, 1).into_iter().next())
}

/// Resolve the first marker occurrence into a placement region.
///
/// `NotFound` when there is no marker, or when the page is too small for a
/// region of the minimum size around it.
pub fn locate_marker(layout: &DocumentLayout, marker: &str, config: &PlacementConfig) -> Placement {
    let Some(hit) = find_first_marker(layout, marker) else {
        return Placement::NotFound;
    };
    match marker_region(&layout.pages[hit.page], &hit.bbox, config) {
        Some(region) => {
            debug!(page = hit.page, x = region.x, y = region.y, "Marker found");
            Placement::Found(PlacementRegion::new(hit.page, region))
        }
        None => Placement::NotFound,
    }
}

/// The marker box expanded by the configured padding.
pub fn padded_marker_box(hit: &Rect, config: &PlacementConfig) -> Rect {
    hit.expand(config.marker_padding)
}

/// Grow the padded marker box to the minimum region size.
///
/// The region starts at the marker's left edge and is centred vertically on
/// it, then shifted (never shrunk) into the page's content bounds. `None`
/// when the grown region is larger than those bounds.
pub fn marker_region(page: &PageLayout, hit: &Rect, config: &PlacementConfig) -> Option<Rect> {
    let padded = padded_marker_box(hit, config);
    let width = padded.width.max(config.min_region_size);
    let height = padded.height.max(config.min_region_size);
    let centre_y = padded.y + padded.height / 2.0;
    let bounds = page.content_bounds(config.page_margin);
    let region = Rect::new(padded.x, centre_y - height / 2.0, width, height).shift_into(&bounds);
    if !bounds.contains(&region) {
        debug!(page = page.index, ?region, ?bounds, "Marker region does not fit the page");
        return None;
    }
    Some(region)
}

fn page_hits(page: &PageLayout, marker: &str, limit: usize) -> Vec<MarkerHit> {
    let needle: Vec<char> = marker.chars().collect();
    let mut hits = Vec::new();
    if needle.is_empty() {
        return hits;
    }
    for block in page.text_blocks() {
        for bbox in block_matches(block, &needle) {
            hits.push(MarkerHit {
                page: page.index,
                bbox,
            });
            if hits.len() >= limit {
                return hits;
            }
        }
    }
    hits
}

/// Boxes of every non-overlapping match of `needle` in the joined text of
/// one text object.
fn block_matches(block: &[TextRun], needle: &[char]) -> Vec<Rect> {
    // (run index, char index within the run) for each joined character.
    let mut haystack = Vec::new();
    let mut origin = Vec::new();
    for (run_index, run) in block.iter().enumerate() {
        for (char_index, ch) in run.text.chars().enumerate() {
            haystack.push(ch);
            origin.push((run_index, char_index));
        }
    }

    let mut boxes = Vec::new();
    let mut start = 0;
    while start + needle.len() <= haystack.len() {
        if haystack[start..start + needle.len()] == *needle {
            if let Some(bbox) = span_bbox(block, &origin[start..start + needle.len()]) {
                boxes.push(bbox);
            }
            start += needle.len();
        } else {
            start += 1;
        }
    }
    boxes
}

fn span_bbox(block: &[TextRun], chars: &[(usize, usize)]) -> Option<Rect> {
    chars
        .chunk_by(|a, b| a.0 == b.0)
        .filter_map(|segment| {
            let (run_index, first) = *segment.first()?;
            let (_, last) = *segment.last()?;
            Some(block[run_index].char_range_bbox(first, last + 1))
        })
        .reduce(|acc, bbox| acc.union(&bbox))
}

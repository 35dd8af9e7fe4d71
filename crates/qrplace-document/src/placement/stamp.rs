// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stamp layout — sizes the QR for a region and arranges the caption around
// it. Pure geometry; the compositor turns the result into PDF operators.

use qrplace_core::config::PlacementConfig;
use qrplace_core::error::QrPlaceError;
use qrplace_core::{QrPayload, Rect};
use tracing::debug;

use crate::image::QrSymbol;

/// Average glyph advance used to estimate caption widths, in ems.
const GLYPH_WIDTH_EM: f64 = 0.5;

/// Line height as a multiple of the font size.
const LINE_HEIGHT: f64 = 1.2;

const EPS: f64 = 1e-6;

/// One positioned caption line.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLine {
    /// Latin-1 text.
    pub text: String,
    pub bold: bool,
    pub font_size: f64,
    pub x: f64,
    pub baseline: f64,
}

impl CaptionLine {
    /// Estimated box of the line.
    pub fn bbox(&self) -> Rect {
        Rect::new(
            self.x,
            self.baseline - 0.2 * self.font_size,
            estimated_width(&self.text, self.font_size),
            self.font_size,
        )
    }
}

/// Where the caption goes relative to the QR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionPosition {
    None,
    Below,
    Beside,
}

/// Final geometry of one stamp.
#[derive(Debug, Clone, PartialEq)]
pub struct StampLayout {
    pub qr: Rect,
    pub caption: Vec<CaptionLine>,
    pub position: CaptionPosition,
    /// Union of the QR and caption boxes.
    pub bounds: Rect,
}

/// Fit a QR symbol and its caption into `region`, anchored bottom-right.
pub fn layout_stamp(
    region: &Rect,
    symbol: &QrSymbol,
    payload: &QrPayload,
    config: &PlacementConfig,
) -> Result<StampLayout, QrPlaceError> {
    let too_small = |minimum: f64| QrPlaceError::RegionTooSmall {
        width: region.width,
        height: region.height,
        minimum,
    };

    let min_qr = config.min_qr_size;
    if region.width + EPS < min_qr || region.height + EPS < min_qr {
        return Err(too_small(min_qr));
    }

    let mut side = (region.width.min(region.height) * config.qr_scale)
        .min(config.max_qr_size)
        .max(min_qr);
    let gap = config.caption_gap;
    let texts = caption_texts(payload, config);

    let (position, lines) = if texts.is_empty() {
        (CaptionPosition::None, Vec::new())
    } else {
        let max_lines = config.caption_max_lines;
        let mut below = wrap_caption(&texts, region.width);
        below.truncate(max_lines);
        let below_height = block_height(&below);
        let beside = wrap_caption(&texts, region.width - side - gap);

        if !below.is_empty() && side + gap + below_height <= region.height + EPS {
            (CaptionPosition::Below, below)
        } else if !beside.is_empty()
            && beside.len() <= max_lines
            && block_height(&beside) <= side + EPS
        {
            (CaptionPosition::Beside, beside)
        } else {
            // Shrink the QR to make room below.
            let reduced = (region.height - gap - below_height).min(side);
            if below.is_empty() || reduced + EPS < min_qr {
                return Err(too_small(min_qr + gap + below_height));
            }
            side = reduced;
            (CaptionPosition::Below, below)
        }
    };

    let pitch = symbol.module_pitch(side);
    if pitch + EPS < config.min_module_size {
        return Err(too_small(
            f64::from(symbol.modules) * config.min_module_size,
        ));
    }

    let caption_height = block_height(&lines);
    let qr = match position {
        CaptionPosition::Below => Rect::new(
            region.right() - side,
            region.y + caption_height + gap,
            side,
            side,
        ),
        _ => Rect::new(region.right() - side, region.y, side, side),
    };

    let widest = lines
        .iter()
        .map(|(text, _, size)| estimated_width(text, *size))
        .fold(0.0, f64::max);
    let (left, mut top) = match position {
        CaptionPosition::Below => ((region.right() - widest).min(qr.x).max(region.x), qr.y - gap),
        CaptionPosition::Beside => (qr.x - gap - widest, qr.top()),
        CaptionPosition::None => (qr.x, qr.y),
    };

    let mut caption = Vec::with_capacity(lines.len());
    for (text, bold, font_size) in lines {
        let baseline = top - font_size;
        top -= font_size * LINE_HEIGHT;
        caption.push(CaptionLine {
            text,
            bold,
            font_size,
            x: left,
            baseline,
        });
    }

    let bounds = caption
        .iter()
        .map(CaptionLine::bbox)
        .fold(qr, |acc, bbox| acc.union(&bbox));

    debug!(
        side,
        pitch,
        ?position,
        lines = caption.len(),
        "Stamp laid out"
    );
    Ok(StampLayout {
        qr,
        caption,
        position,
        bounds,
    })
}

/// Title and certificate id, or nothing when there is no certificate id.
fn caption_texts(payload: &QrPayload, config: &PlacementConfig) -> Vec<(String, bool, f64)> {
    match &payload.certificate_id {
        Some(id) => vec![
            (to_latin1(&config.caption_title), true, config.caption_title_font_size),
            (to_latin1(id), false, config.caption_font_size),
        ],
        None => Vec::new(),
    }
}

/// Wrap every caption paragraph to `width`. Empty when not even one
/// character fits per line.
fn wrap_caption(texts: &[(String, bool, f64)], width: f64) -> Vec<(String, bool, f64)> {
    let mut lines = Vec::new();
    for (text, bold, size) in texts {
        let per_line = (width / (GLYPH_WIDTH_EM * size) + EPS).floor();
        if per_line < 1.0 {
            return Vec::new();
        }
        lines.extend(
            wrap_text(text, per_line as usize)
                .into_iter()
                .map(|line| (line, *bold, *size)),
        );
    }
    lines
}

fn block_height(lines: &[(String, bool, f64)]) -> f64 {
    lines.iter().map(|(_, _, size)| size * LINE_HEIGHT).sum()
}

fn estimated_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * GLYPH_WIDTH_EM * font_size
}

/// Replace characters outside Latin-1 (and control characters) with `?`.
pub fn to_latin1(text: &str) -> String {
    text.chars()
        .map(|c| {
            if (c as u32) < 0x100 && !c.is_control() {
                c
            } else {
                '?'
            }
        })
        .collect()
}

/// Word-wrap `text` so that no line exceeds `max_width` characters. Words
/// longer than a line are force-broken.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut result = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        if chars.len() > max_width {
            if !current.is_empty() {
                result.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let mut chunks = chars.chunks(max_width).peekable();
            while let Some(chunk) = chunks.next() {
                if chunks.peek().is_some() {
                    result.push(chunk.iter().collect());
                } else {
                    current = chunk.iter().collect();
                    current_len = chunk.len();
                }
            }
        } else if current.is_empty() {
            current.push_str(word);
            current_len = chars.len();
        } else if current_len + 1 + chars.len() <= max_width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + chars.len();
        } else {
            result.push(std::mem::replace(&mut current, word.to_string()));
            current_len = chars.len();
        }
    }

    if !current.is_empty() {
        result.push(current);
    }
    result
}

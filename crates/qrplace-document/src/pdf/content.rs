// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-stream interpretation — walks a page's decoded operators with a
// graphics-state stack and text state, and records where text, images, and
// painted paths land on the page.
//
// Only geometry is tracked. Colours matter in exactly one place: paths that
// are filled pure white and never stroked are treated as background and do
// not occupy the page.

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use qrplace_core::Rect;
use tracing::{debug, warn};

use super::layout::{Matrix, PageLayout, TextRun};

/// Form XObjects nested deeper than this are recorded by their bounds only.
const MAX_FORM_DEPTH: usize = 8;

/// Reference chains longer than this are treated as broken.
const MAX_REFERENCE_HOPS: usize = 16;

/// Glyph advance (thousandths of an em) for fonts without a widths table.
const DEFAULT_GLYPH_WIDTH: f64 = 500.0;

/// Glyph extent below and above the baseline, in ems.
const DESCENT_EM: f64 = 0.2;
const ASCENT_EM: f64 = 0.8;

const WHITE_TOLERANCE: f64 = 1e-3;

// -- Object helpers -----------------------------------------------------------

/// Follow indirect references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a Document, mut object: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_REFERENCE_HOPS {
        match object {
            Object::Reference(id) => object = doc.get_object(*id).ok()?,
            direct => return Some(direct),
        }
    }
    None
}

pub(crate) fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Convert a numeric object (Integer or Real) to f64.
pub(crate) fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

fn name(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

fn numbers(operands: &[Object]) -> Option<Vec<f64>> {
    operands.iter().map(number).collect()
}

fn pair(operands: &[Object]) -> Option<(f64, f64)> {
    match operands {
        [x, y] => Some((number(x)?, number(y)?)),
        _ => None,
    }
}

fn matrix_operand(operands: &[Object]) -> Option<Matrix> {
    match numbers(operands)?.as_slice() {
        [a, b, c, d, e, f] => Some(Matrix::new(*a, *b, *c, *d, *e, *f)),
        _ => None,
    }
}

/// Look up a key on a page dictionary, walking up the page tree via /Parent.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_REFERENCE_HOPS {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").ok()?;
        current = resolve_dict(doc, parent)?;
    }
    None
}

/// Raw bytes of a stream, decompressed when a filter is present.
pub(crate) fn stream_bytes(stream: &Stream) -> Option<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        match stream.decompressed_content() {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!(%err, "Failed to decompress content stream");
                None
            }
        }
    } else {
        Some(stream.content.clone())
    }
}

/// Concatenated content of a page's /Contents (single stream or array).
///
/// Returns `None` when the contents exist but cannot be read.
pub(crate) fn page_content(doc: &Document, page: &Dictionary) -> Option<Vec<u8>> {
    let Ok(contents) = page.get(b"Contents") else {
        return Some(Vec::new());
    };
    match resolve(doc, contents)? {
        Object::Stream(stream) => stream_bytes(stream),
        Object::Array(parts) => {
            let mut content = Vec::new();
            for part in parts {
                let Object::Stream(stream) = resolve(doc, part)? else {
                    return None;
                };
                if !content.is_empty() {
                    content.push(b'\n');
                }
                content.extend_from_slice(&stream_bytes(stream)?);
            }
            Some(content)
        }
        Object::Null => Some(Vec::new()),
        _ => None,
    }
}

fn lookup_resource<'a>(
    doc: &'a Document,
    resources: Option<&'a Dictionary>,
    category: &[u8],
    key: &[u8],
) -> Option<&'a Object> {
    let category = resolve_dict(doc, resources?.get(category).ok()?)?;
    resolve(doc, category.get(key).ok()?)
}

// -- Fonts --------------------------------------------------------------------

/// Glyph widths of one font resource.
#[derive(Debug, Clone)]
struct FontMetrics {
    first_char: u32,
    /// Thousandths of an em, indexed by `code - first_char`.
    widths: Vec<f64>,
    default_width: f64,
    /// Composite (Type0) fonts use two-byte codes.
    two_byte: bool,
}

impl FontMetrics {
    fn fallback() -> Self {
        Self {
            first_char: 0,
            widths: Vec::new(),
            default_width: DEFAULT_GLYPH_WIDTH,
            two_byte: false,
        }
    }

    fn from_dict(doc: &Document, font: &Dictionary) -> Self {
        let two_byte = font
            .get(b"Subtype")
            .ok()
            .and_then(name)
            .is_some_and(|subtype| subtype == b"Type0");

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(number)
            .map(|n| n.max(0.0) as u32)
            .unwrap_or(0);

        let widths = font
            .get(b"Widths")
            .ok()
            .and_then(|w| resolve(doc, w))
            .and_then(|w| w.as_array().ok())
            .map(|array| {
                array
                    .iter()
                    .map(|w| resolve(doc, w).and_then(number).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();

        let default_width = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|d| resolve_dict(doc, d))
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(number)
            .filter(|w| *w > 0.0)
            .unwrap_or(if two_byte { 1000.0 } else { DEFAULT_GLYPH_WIDTH });

        Self {
            first_char,
            widths,
            default_width,
            two_byte,
        }
    }

    fn width(&self, code: u32) -> f64 {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }

    /// Split shown bytes into character codes and the characters they stand
    /// for. Simple fonts map one byte to one Latin-1 character.
    fn decode(&self, bytes: &[u8]) -> Vec<(u32, char)> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| {
                    let code = pair
                        .iter()
                        .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte));
                    (code, char::from_u32(code).unwrap_or('\u{FFFD}'))
                })
                .collect()
        } else {
            bytes
                .iter()
                .map(|byte| (u32::from(*byte), char::from(*byte)))
                .collect()
        }
    }
}

fn load_font(doc: &Document, resources: Option<&Dictionary>, font_name: &[u8]) -> FontMetrics {
    match lookup_resource(doc, resources, b"Font", font_name).and_then(|f| resolve_dict(doc, f)) {
        Some(font) => FontMetrics::from_dict(doc, font),
        None => {
            debug!(
                font = %String::from_utf8_lossy(font_name),
                "Font resource not found, using default widths"
            );
            FontMetrics::fallback()
        }
    }
}

// -- Interpreter ----------------------------------------------------------------

/// Graphics state saved and restored by `q`/`Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
    white_fill: bool,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            white_fill: false,
        }
    }
}

enum TextPiece<'a> {
    Bytes(&'a [u8]),
    Adjust(f64),
}

fn is_white(components: &[f64]) -> bool {
    let near = |v: f64, target: f64| (v - target).abs() < WHITE_TOLERANCE;
    match components {
        [gray] => near(*gray, 1.0),
        [r, g, b] => near(*r, 1.0) && near(*g, 1.0) && near(*b, 1.0),
        [c, m, y, k] => near(*c, 0.0) && near(*m, 0.0) && near(*y, 0.0) && near(*k, 0.0),
        _ => false,
    }
}

/// Build the layout of one page.
pub(crate) fn interpret_page(
    doc: &Document,
    page_id: ObjectId,
    index: usize,
    bounds: Rect,
) -> PageLayout {
    let mut layout = PageLayout::new(index, bounds);
    let Ok(page) = doc.get_dictionary(page_id) else {
        warn!(page = index, "Page object is not a dictionary; treating as fully occupied");
        layout.graphics.push(bounds);
        return layout;
    };

    let resources = inherited(doc, page_id, b"Resources").and_then(|r| resolve_dict(doc, r));
    let Some(content) = page_content(doc, page) else {
        warn!(page = index, "Unreadable page contents; treating as fully occupied");
        layout.graphics.push(bounds);
        return layout;
    };

    let mut interpreter = Interpreter {
        doc,
        layout: &mut layout,
        next_block: 0,
    };
    if !interpreter.run(&content, resources, Matrix::IDENTITY, 0) {
        warn!(page = index, "Undecodable content stream; treating as fully occupied");
        layout.graphics.push(bounds);
    }

    debug!(
        page = index,
        text_runs = layout.text_runs.len(),
        graphics = layout.graphics.len(),
        "Page layout extracted"
    );
    layout
}

struct Interpreter<'a, 'l> {
    doc: &'a Document,
    layout: &'l mut PageLayout,
    next_block: usize,
}

impl<'a> Interpreter<'a, '_> {
    /// Interpret one content stream. Returns `false` if it cannot be decoded.
    fn run(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        base: Matrix,
        depth: usize,
    ) -> bool {
        let content = match Content::decode(content) {
            Ok(content) => content,
            Err(err) => {
                debug!(%err, depth, "Content decode failed");
                return false;
            }
        };

        let doc = self.doc;
        let mut state = GraphicsState::new(base);
        let mut saved: Vec<GraphicsState> = Vec::new();
        let mut fonts: HashMap<Vec<u8>, FontMetrics> = HashMap::new();
        let mut text_matrix = Matrix::IDENTITY;
        let mut line_matrix = Matrix::IDENTITY;
        let mut block: Option<usize> = None;
        let mut path: Vec<(f64, f64)> = Vec::new();

        for op in &content.operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                // Graphics state
                "q" => saved.push(state.clone()),
                "Q" => {
                    if let Some(previous) = saved.pop() {
                        state = previous;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_operand(operands) {
                        state.ctm = m.then(&state.ctm);
                    }
                }

                // Fill colour
                "g" | "rg" | "k" | "sc" | "scn" => {
                    state.white_fill = numbers(operands).is_some_and(|c| is_white(&c));
                }
                "cs" => state.white_fill = false,

                // Text objects and state
                "BT" => {
                    text_matrix = Matrix::IDENTITY;
                    line_matrix = Matrix::IDENTITY;
                    block = Some(self.take_block());
                }
                "ET" => block = None,
                "Tf" => {
                    if let Some(font) = operands.first().and_then(name) {
                        fonts
                            .entry(font.to_vec())
                            .or_insert_with(|| load_font(doc, resources, font));
                        state.font = Some(font.to_vec());
                    }
                    if let Some(size) = operands.get(1).and_then(number) {
                        state.font_size = size;
                    }
                }
                "Tc" => set_number(operands, &mut state.char_spacing),
                "Tw" => set_number(operands, &mut state.word_spacing),
                "TL" => set_number(operands, &mut state.leading),
                "Ts" => set_number(operands, &mut state.rise),
                "Tz" => {
                    if let Some(scale) = operands.first().and_then(number) {
                        state.horizontal_scale = scale / 100.0;
                    }
                }
                "Td" | "TD" => {
                    if let Some((tx, ty)) = pair(operands) {
                        if op.operator == "TD" {
                            state.leading = -ty;
                        }
                        line_matrix = Matrix::translate(tx, ty).then(&line_matrix);
                        text_matrix = line_matrix;
                    }
                }
                "Tm" => {
                    if let Some(m) = matrix_operand(operands) {
                        line_matrix = m;
                        text_matrix = m;
                    }
                }
                "T*" => {
                    line_matrix = Matrix::translate(0.0, -state.leading).then(&line_matrix);
                    text_matrix = line_matrix;
                }

                // Text showing
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        let block = self.block_or_new(&mut block);
                        self.show(&[TextPiece::Bytes(bytes)], &state, &fonts, &mut text_matrix, block);
                    }
                }
                "'" | "\"" => {
                    let string_index = if op.operator == "'" {
                        0
                    } else {
                        if let Some(aw) = operands.first().and_then(number) {
                            state.word_spacing = aw;
                        }
                        if let Some(ac) = operands.get(1).and_then(number) {
                            state.char_spacing = ac;
                        }
                        2
                    };
                    line_matrix = Matrix::translate(0.0, -state.leading).then(&line_matrix);
                    text_matrix = line_matrix;
                    if let Some(Object::String(bytes, _)) = operands.get(string_index) {
                        let block = self.block_or_new(&mut block);
                        self.show(&[TextPiece::Bytes(bytes)], &state, &fonts, &mut text_matrix, block);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        let pieces: Vec<TextPiece<'_>> = items
                            .iter()
                            .filter_map(|item| match item {
                                Object::String(bytes, _) => Some(TextPiece::Bytes(bytes)),
                                other => number(other).map(TextPiece::Adjust),
                            })
                            .collect();
                        let block = self.block_or_new(&mut block);
                        self.show(&pieces, &state, &fonts, &mut text_matrix, block);
                    }
                }

                // Path construction
                "m" | "l" | "c" | "v" | "y" => {
                    if let Some(coords) = numbers(operands) {
                        path.extend(
                            coords
                                .chunks_exact(2)
                                .map(|xy| state.ctm.apply(xy[0], xy[1])),
                        );
                    }
                }
                "re" => {
                    if let Some([x, y, w, h]) = numbers(operands).and_then(|n| <[f64; 4]>::try_from(n).ok()) {
                        for (px, py) in [(x, y), (x + w, y), (x, y + h), (x + w, y + h)] {
                            path.push(state.ctm.apply(px, py));
                        }
                    }
                }

                // Path painting
                "S" | "s" | "B" | "B*" | "b" | "b*" => self.paint(&mut path),
                "f" | "F" | "f*" => {
                    if state.white_fill {
                        path.clear();
                    } else {
                        self.paint(&mut path);
                    }
                }
                "n" => path.clear(),

                // External and inline images, forms
                "Do" => {
                    if let Some(xobject) = operands.first().and_then(name) {
                        self.draw_xobject(xobject, resources, state.ctm, depth);
                    }
                }
                "BI" => self.layout.graphics.push(unit_square(&state.ctm)),

                _ => {}
            }
        }
        true
    }

    fn take_block(&mut self) -> usize {
        let block = self.next_block;
        self.next_block += 1;
        block
    }

    /// Text shown outside `BT … ET` is malformed but common; give it its own block.
    fn block_or_new(&mut self, current: &mut Option<usize>) -> usize {
        match current {
            Some(block) => *block,
            None => {
                let block = self.take_block();
                *current = Some(block);
                block
            }
        }
    }

    fn show(
        &mut self,
        pieces: &[TextPiece<'_>],
        state: &GraphicsState,
        fonts: &HashMap<Vec<u8>, FontMetrics>,
        text_matrix: &mut Matrix,
        block: usize,
    ) {
        let fallback = FontMetrics::fallback();
        let metrics = state
            .font
            .as_ref()
            .and_then(|font| fonts.get(font))
            .unwrap_or(&fallback);
        let size = state.font_size;
        let scale = state.horizontal_scale;
        let start = text_matrix.then(&state.ctm);

        let mut cursor = 0.0;
        let mut text = String::new();
        let mut spans = Vec::new();
        for piece in pieces {
            match piece {
                TextPiece::Adjust(amount) => cursor -= amount / 1000.0 * size * scale,
                TextPiece::Bytes(bytes) => {
                    for (code, ch) in metrics.decode(bytes) {
                        let glyph = metrics.width(code) / 1000.0 * size;
                        let mut advance = glyph + state.char_spacing;
                        if !metrics.two_byte && code == 32 {
                            advance += state.word_spacing;
                        }
                        spans.push((cursor, cursor + glyph * scale));
                        text.push(ch);
                        cursor += advance * scale;
                    }
                }
            }
        }
        *text_matrix = Matrix::translate(cursor, 0.0).then(text_matrix);

        if text.is_empty() {
            return;
        }
        let descent = state.rise - DESCENT_EM * size;
        let ascent = state.rise + ASCENT_EM * size;
        self.layout
            .text_runs
            .push(TextRun::new(text, block, start, spans, descent, ascent));
    }

    fn paint(&mut self, path: &mut Vec<(f64, f64)>) {
        if let Some(bbox) = Rect::bounding(path.drain(..)) {
            self.layout.graphics.push(bbox);
        }
    }

    fn draw_xobject(
        &mut self,
        xobject_name: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: Matrix,
        depth: usize,
    ) {
        let doc = self.doc;
        let Some(Object::Stream(stream)) = lookup_resource(doc, resources, b"XObject", xobject_name)
        else {
            debug!(
                xobject = %String::from_utf8_lossy(xobject_name),
                "XObject not found in resources"
            );
            return;
        };

        match stream.dict.get(b"Subtype").ok().and_then(name) {
            Some(b"Image") => self.layout.graphics.push(unit_square(&ctm)),
            Some(b"Form") => {
                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|m| resolve(doc, m))
                    .and_then(|m| m.as_array().ok())
                    .and_then(|m| matrix_operand(m))
                    .unwrap_or(Matrix::IDENTITY);
                let form_ctm = matrix.then(&ctm);
                let form_bbox = stream
                    .dict
                    .get(b"BBox")
                    .ok()
                    .and_then(|b| resolve(doc, b))
                    .and_then(|b| b.as_array().ok())
                    .and_then(|b| numbers(b))
                    .and_then(|b| match b.as_slice() {
                        [x0, y0, x1, y1] => Some(Rect::from_corners(*x0, *y0, *x1, *y1)),
                        _ => None,
                    });

                let fully_occupied = || form_bbox.map(|b| form_ctm.transform_rect(&b));
                if depth + 1 >= MAX_FORM_DEPTH {
                    warn!(depth, "Form XObject nesting too deep; using its bounding box");
                    if let Some(bbox) = fully_occupied() {
                        self.layout.graphics.push(bbox);
                    }
                    return;
                }

                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve_dict(doc, r))
                    .or(resources);
                let decoded = stream_bytes(stream)
                    .is_some_and(|bytes| self.run(&bytes, form_resources, form_ctm, depth + 1));
                if !decoded {
                    if let Some(bbox) = fully_occupied() {
                        self.layout.graphics.push(bbox);
                    }
                }
            }
            _ => {}
        }
    }
}

fn set_number(operands: &[Object], target: &mut f64) {
    if let Some(value) = operands.first().and_then(number) {
        *target = value;
    }
}

fn unit_square(ctm: &Matrix) -> Rect {
    ctm.transform_rect(&Rect::new(0.0, 0.0, 1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::PdfBuilder;

    fn layout_of(bytes: &[u8]) -> PageLayout {
        let doc = Document::load_mem(bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        interpret_page(&doc, page_id, 0, Rect::new(0.0, 0.0, 612.0, 792.0))
    }

    #[test]
    fn simple_text_run_is_positioned_at_td() {
        let bytes = PdfBuilder::letter()
            .page(b"BT /F1 12 Tf 72 700 Td (Hello) Tj ET")
            .build();
        let layout = layout_of(&bytes);
        assert_eq!(layout.text_runs.len(), 1);
        let run = &layout.text_runs[0];
        assert_eq!(run.text, "Hello");
        // Helvetica has no widths table in the fixture: 0.5 em per glyph.
        assert!((run.bbox.x - 72.0).abs() < 1e-6);
        assert!((run.bbox.width - 30.0).abs() < 1e-6);
        assert!((run.bbox.y - (700.0 - 2.4)).abs() < 1e-6);
    }

    #[test]
    fn tj_array_adjustments_move_the_cursor() {
        let bytes = PdfBuilder::letter()
            .page(b"BT /F1 10 Tf 100 100 Td [(AB) -1000 (C)] TJ ET")
            .build();
        let layout = layout_of(&bytes);
        let run = &layout.text_runs[0];
        assert_eq!(run.text, "ABC");
        // 2 glyphs * 5pt + 10pt kerning gap + 5pt glyph.
        assert!((run.bbox.width - 25.0).abs() < 1e-6);
    }

    #[test]
    fn cm_scales_text_and_images() {
        let bytes = PdfBuilder::letter()
            .with_image("Im0")
            .page(b"q 200 0 0 150 100 300 cm /Im0 Do Q q 2 0 0 2 0 0 cm BT /F1 10 Tf 10 10 Td (x) Tj ET Q")
            .build();
        let layout = layout_of(&bytes);
        assert_eq!(layout.graphics, vec![Rect::new(100.0, 300.0, 200.0, 150.0)]);
        let run = &layout.text_runs[0];
        assert!((run.bbox.x - 20.0).abs() < 1e-6);
        assert!((run.bbox.width - 10.0).abs() < 1e-6);
    }

    #[test]
    fn white_fills_are_background_but_strokes_are_not() {
        let bytes = PdfBuilder::letter()
            .page(b"1 g 0 0 612 792 re f 0 G 50 50 m 150 50 l S 0 g 10 10 20 20 re f")
            .build();
        let layout = layout_of(&bytes);
        assert_eq!(layout.graphics.len(), 2);
        assert_eq!(layout.graphics[0], Rect::new(50.0, 50.0, 100.0, 0.0));
        assert_eq!(layout.graphics[1], Rect::new(10.0, 10.0, 20.0, 20.0));
    }

    #[test]
    fn clipping_paths_are_discarded() {
        let bytes = PdfBuilder::letter()
            .page(b"0 0 300 300 re W n BT /F1 12 Tf 10 10 Td (a) Tj ET")
            .build();
        let layout = layout_of(&bytes);
        assert!(layout.graphics.is_empty());
    }

    #[test]
    fn each_text_object_gets_its_own_block() {
        let bytes = PdfBuilder::letter()
            .page(b"BT /F1 12 Tf 10 10 Td (a) Tj (b) Tj ET BT /F1 12 Tf 10 40 Td (c) Tj ET")
            .build();
        let layout = layout_of(&bytes);
        let blocks: Vec<usize> = layout.text_runs.iter().map(|r| r.block).collect();
        assert_eq!(blocks, vec![0, 0, 1]);
    }

    #[test]
    fn t_star_uses_leading() {
        let bytes = PdfBuilder::letter()
            .page(b"BT /F1 10 Tf 14 TL 50 500 Td (one) Tj T* (two) Tj ET")
            .build();
        let layout = layout_of(&bytes);
        let dy = layout.text_runs[0].bbox.y - layout.text_runs[1].bbox.y;
        assert!((dy - 14.0).abs() < 1e-6);
    }

    #[test]
    fn form_xobject_content_is_interpreted_with_its_matrix() {
        let bytes = PdfBuilder::letter()
            .with_form("Fm0", [1.0, 0.0, 0.0, 1.0, 200.0, 100.0], b"0 0 50 40 re f")
            .page(b"/Fm0 Do")
            .build();
        let layout = layout_of(&bytes);
        assert_eq!(layout.graphics, vec![Rect::new(200.0, 100.0, 50.0, 40.0)]);
    }

    #[test]
    fn widths_table_drives_advances() {
        let bytes = PdfBuilder::letter()
            .with_font_widths(32, vec![250.0, 1000.0])
            .page(b"BT /F1 10 Tf 0 0 Td ( !) Tj ET")
            .build();
        let layout = layout_of(&bytes);
        assert!((layout.text_runs[0].bbox.width - 12.5).abs() < 1e-6);
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page layout model — what the placement heuristics see of a PDF page:
// its bounds, the text runs it shows, and the boxes its images and vector
// paths cover. Built by `pdf::content` from the decoded content streams.

use qrplace_core::Rect;

/// 2D affine transform in PDF order `[a b c d e f]`.
///
/// Points are row vectors: `(x, y) -> (a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Axis-aligned bounds of `rect` after transformation.
    pub fn transform_rect(&self, rect: &Rect) -> Rect {
        let corners = [
            self.apply(rect.x, rect.y),
            self.apply(rect.right(), rect.y),
            self.apply(rect.x, rect.top()),
            self.apply(rect.right(), rect.top()),
        ];
        // Four points are always present.
        Rect::bounding(corners).unwrap_or(*rect)
    }
}

/// One string shown by a text-showing operator (`Tj`, `TJ`, `'`, `"`).
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Bounds of the whole run in user space.
    pub bbox: Rect,
    /// Index of the `BT … ET` text object this run belongs to, unique per page.
    pub block: usize,
    /// Text space at the start of the run mapped to user space.
    matrix: Matrix,
    /// Horizontal extent of each character in text space, one entry per char.
    spans: Vec<(f64, f64)>,
    /// Vertical extent of the glyphs in text space.
    descent: f64,
    ascent: f64,
}

impl TextRun {
    pub(crate) fn new(
        text: String,
        block: usize,
        matrix: Matrix,
        spans: Vec<(f64, f64)>,
        descent: f64,
        ascent: f64,
    ) -> Self {
        let mut run = Self {
            text,
            bbox: Rect::default(),
            block,
            matrix,
            spans,
            descent,
            ascent,
        };
        run.bbox = run.char_range_bbox(0, run.char_count());
        run
    }

    pub fn char_count(&self) -> usize {
        self.spans.len()
    }

    /// User-space bounds of characters `start..end` of this run.
    ///
    /// Out-of-range indices are clamped; an empty range yields a zero-width
    /// box at the position of `start`.
    pub fn char_range_bbox(&self, start: usize, end: usize) -> Rect {
        if self.spans.is_empty() {
            let (x, y) = self.matrix.apply(0.0, 0.0);
            return Rect::new(x, y, 0.0, 0.0);
        }
        let last = self.spans.len() - 1;
        let start = start.min(last);
        let x0 = self.spans[start].0;
        let x1 = if end > start {
            self.spans[(end - 1).min(last)].1
        } else {
            x0
        };
        let (left, right) = (x0.min(x1), x0.max(x1));
        self.matrix
            .transform_rect(&Rect::from_corners(left, self.descent, right, self.ascent))
    }
}

/// Layout of a single page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    /// Zero-based page index.
    pub index: usize,
    /// The page's MediaBox.
    pub bounds: Rect,
    /// Text runs in content-stream order.
    pub text_runs: Vec<TextRun>,
    /// Bounds of images, inline images, painted paths, in content-stream order.
    pub graphics: Vec<Rect>,
}

impl PageLayout {
    pub fn new(index: usize, bounds: Rect) -> Self {
        Self {
            index,
            bounds,
            text_runs: Vec::new(),
            graphics: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.bounds.width
    }

    pub fn height(&self) -> f64 {
        self.bounds.height
    }

    /// Page bounds shrunk by `margin` on every side.
    pub fn content_bounds(&self, margin: f64) -> Rect {
        self.bounds.expand(-margin)
    }

    /// Every occupied box: text runs first, then graphics. Runs of pure
    /// whitespace leave no ink and are skipped.
    pub fn occupied(&self) -> impl Iterator<Item = Rect> + '_ {
        self.text_runs
            .iter()
            .filter(|run| !run.text.trim().is_empty())
            .map(|run| run.bbox)
            .chain(self.graphics.iter().copied())
    }

    /// Text runs grouped by text object, in order.
    pub fn text_blocks(&self) -> Vec<&[TextRun]> {
        self.text_runs
            .chunk_by(|a, b| a.block == b.block)
            .collect()
    }
}

/// Layout of a whole document, pages in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentLayout {
    pub pages: Vec<PageLayout>,
}

impl DocumentLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Option<&PageLayout> {
        self.pages.get(index)
    }
}

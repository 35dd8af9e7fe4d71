// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for qrplace.
//
// All coordinates are PDF user-space points with the origin at the
// bottom-left of the page and y growing upward.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a rectangle from two opposite corners given in any order.
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        let (left, right) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (bottom, top) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self::new(left, bottom, right - left, top - bottom)
    }

    /// Smallest rectangle enclosing every point, or `None` for no points.
    pub fn bounding(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let (mut x0, mut y0, mut x1, mut y1) = (x, y, x, y);
        for (x, y) in iter {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        Some(Self::from_corners(x0, y0, x1, y1))
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// True when the interiors overlap, or when a degenerate (zero-width or
    /// zero-height) rectangle lies strictly inside the other one. Rectangles
    /// that merely share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }

    /// True when `other` lies entirely inside `self` (edges may touch).
    pub fn contains(&self, other: &Rect) -> bool {
        const EPS: f64 = 1e-6;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.top() <= self.top() + EPS
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.top().max(other.top()),
        )
    }

    /// The overlapping part of two rectangles, or `None` when they share no
    /// area.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.top().min(other.top());
        (x1 > x0 && y1 > y0).then(|| Rect::from_corners(x0, y0, x1, y1))
    }

    /// Grow (or shrink, for negative `amount`) every side by `amount`.
    /// Shrinking never produces a negative size.
    pub fn expand(&self, amount: f64) -> Rect {
        let width = (self.width + 2.0 * amount).max(0.0);
        let height = (self.height + 2.0 * amount).max(0.0);
        Rect::new(
            self.x + (self.width - width) / 2.0,
            self.y + (self.height - height) / 2.0,
            width,
            height,
        )
    }

    /// Shift this rectangle (without resizing) so it lies inside `bounds`
    /// where possible. A rectangle larger than `bounds` is aligned to its
    /// left and bottom edges.
    pub fn shift_into(&self, bounds: &Rect) -> Rect {
        let x = self.x.min(bounds.right() - self.width).max(bounds.x);
        let y = self.y.min(bounds.top() - self.height).max(bounds.y);
        Rect::new(x, y, self.width, self.height)
    }

    /// Euclidean distance between the closest points of two rectangles;
    /// zero when they touch or overlap.
    pub fn distance_to(&self, other: &Rect) -> f64 {
        let dx = (other.x - self.right()).max(self.x - other.right()).max(0.0);
        let dy = (other.y - self.top()).max(self.y - other.top()).max(0.0);
        dx.hypot(dy)
    }
}

/// A resolved rectangle on a specific page chosen to host the QR and caption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementRegion {
    /// Zero-based page index in document order.
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PlacementRegion {
    pub fn new(page: usize, rect: Rect) -> Self {
        Self {
            page,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Outcome of a placement search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Found(PlacementRegion),
    NotFound,
}

impl Placement {
    pub fn region(&self) -> Option<PlacementRegion> {
        match self {
            Self::Found(region) => Some(*region),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// How a placement region was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementSource {
    /// Anchored at a marker string found in the text layer.
    Marker,
    /// Largest free area found by the grid search.
    EmptyRegion,
    /// Free area on a blank page appended for the stamp.
    TrailingPage,
    /// Supplied by the caller.
    Explicit,
}

impl PlacementSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::EmptyRegion => "empty_region",
            Self::TrailingPage => "trailing_page",
            Self::Explicit => "explicit",
        }
    }
}

/// What to do when neither a marker nor a free area is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// Fail with `PlacementNotFound`.
    #[default]
    Fail,
    /// Append a blank page and stamp it.
    AppendPage,
}

impl std::str::FromStr for Fallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "fail" => Ok(Self::Fail),
            "append_page" | "append-page" => Ok(Self::AppendPage),
            other => Err(format!("unknown fallback '{other}'")),
        }
    }
}

/// The data encoded into the QR plus the identifier shown in its caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// Verification URL or string encoded into the QR symbol.
    pub data: String,
    /// Certificate identifier rendered in the caption, if any.
    pub certificate_id: Option<String>,
}

impl QrPayload {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            certificate_id: None,
        }
    }

    pub fn with_certificate_id(mut self, certificate_id: impl Into<String>) -> Self {
        let id = certificate_id.into();
        self.certificate_id = if id.trim().is_empty() { None } else { Some(id) };
        self
    }
}

/// Read-only detection result for previewing a placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Candidate regions; the first one is what stamping would use.
    pub candidate_regions: Vec<PlacementRegion>,
    pub marker_found: bool,
    pub page_count: usize,
    /// Hex SHA-256 of the analysed bytes.
    pub document_digest: String,
}

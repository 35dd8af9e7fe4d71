// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Empty-region finder — rasterises a page's occupied boxes onto a coarse grid
// and finds the largest free rectangle with a row-histogram and monotonic
// stack pass.
//
// The grid is anchored at the bottom-right corner of the content area, so
// the leftover strip (less than one cell) falls on the left and top edges.

use std::cmp::Ordering;

use qrplace_core::config::PlacementConfig;
use qrplace_core::{Placement, PlacementRegion, Rect};
use tracing::{debug, instrument, trace};

use crate::pdf::layout::PageLayout;

/// Grid dimensions are capped in each direction; cells grow beyond the
/// configured size when a page would need more.
pub const MAX_GRID_CELLS: usize = 1024;

/// Boxes thinner than this still block the cells they lie in.
const DEGENERATE_EPSILON: f64 = 1e-6;

/// First page (in order) with a free rectangle of at least
/// `min_width × min_height`, and the best such rectangle on it.
#[instrument(skip(pages, config), fields(pages = pages.len()))]
pub fn find_empty_region(
    pages: &[PageLayout],
    min_width: f64,
    min_height: f64,
    config: &PlacementConfig,
) -> Placement {
    for page in pages {
        if let Some(rect) = best_region_on_page(page, min_width, min_height, config) {
            debug!(
                page = page.index,
                x = rect.x,
                y = rect.y,
                width = rect.width,
                height = rect.height,
                "Empty region found"
            );
            return Placement::Found(PlacementRegion::new(page.index, rect));
        }
    }
    debug!("No page has a qualifying empty region");
    Placement::NotFound
}

/// The best free rectangle on one page: largest area, then lowest bottom
/// edge, then largest right edge, then lowest left edge.
pub fn best_region_on_page(
    page: &PageLayout,
    min_width: f64,
    min_height: f64,
    config: &PlacementConfig,
) -> Option<Rect> {
    let grid = OccupancyGrid::build(page, config)?;
    let best = grid.best_rectangle(min_width, min_height)?;
    Some(grid.to_rect(&best))
}

/// A free rectangle in cell units; `row` 0 is the bottom row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRect {
    col: usize,
    row: usize,
    cols: usize,
    rows: usize,
}

impl CellRect {
    fn area(&self) -> usize {
        self.cols * self.rows
    }

    fn right(&self) -> usize {
        self.col + self.cols
    }

    /// `Greater` means `self` is the better placement.
    fn preference(&self, other: &CellRect) -> Ordering {
        self.area()
            .cmp(&other.area())
            .then_with(|| other.row.cmp(&self.row))
            .then_with(|| self.right().cmp(&other.right()))
            .then_with(|| other.col.cmp(&self.col))
    }
}

struct OccupancyGrid {
    origin_x: f64,
    origin_y: f64,
    cell_width: f64,
    cell_height: f64,
    cols: usize,
    rows: usize,
    /// Row-major, bottom row first.
    blocked: Vec<bool>,
}

impl OccupancyGrid {
    fn build(page: &PageLayout, config: &PlacementConfig) -> Option<Self> {
        let area = page.content_bounds(config.page_margin);
        let (cols, cell_width) = axis_cells(area.width, config.grid_cell_size);
        let (rows, cell_height) = axis_cells(area.height, config.grid_cell_size);
        if cols == 0 || rows == 0 {
            return None;
        }

        let mut grid = Self {
            origin_x: area.right() - cols as f64 * cell_width,
            origin_y: area.y,
            cell_width,
            cell_height,
            cols,
            rows,
            blocked: vec![false; cols * rows],
        };
        let mut boxes = 0usize;
        for occupied in page.occupied() {
            grid.block(&occupied);
            boxes += 1;
        }
        trace!(page = page.index, cols, rows, boxes, "Occupancy grid built");
        Some(grid)
    }

    fn cell(&self, col: usize, row: usize) -> Rect {
        Rect::new(
            self.origin_x + col as f64 * self.cell_width,
            self.origin_y + row as f64 * self.cell_height,
            self.cell_width,
            self.cell_height,
        )
    }

    fn to_rect(&self, cells: &CellRect) -> Rect {
        let origin = self.cell(cells.col, cells.row);
        Rect::new(
            origin.x,
            origin.y,
            cells.cols as f64 * self.cell_width,
            cells.rows as f64 * self.cell_height,
        )
    }

    fn block(&mut self, occupied: &Rect) {
        if !(occupied.x.is_finite()
            && occupied.y.is_finite()
            && occupied.width.is_finite()
            && occupied.height.is_finite())
        {
            return;
        }
        let probe = if occupied.width <= 0.0 || occupied.height <= 0.0 {
            occupied.expand(DEGENERATE_EPSILON)
        } else {
            *occupied
        };

        let col_range = cell_range(probe.x, probe.right(), self.origin_x, self.cell_width, self.cols);
        let row_range = cell_range(probe.y, probe.top(), self.origin_y, self.cell_height, self.rows);
        let (Some((c0, c1)), Some((r0, r1))) = (col_range, row_range) else {
            return;
        };
        for row in r0..r1 {
            for col in c0..c1 {
                if self.cell(col, row).intersects(&probe) {
                    self.blocked[row * self.cols + col] = true;
                }
            }
        }
    }

    /// Best qualifying rectangle of free cells, if any.
    fn best_rectangle(&self, min_width: f64, min_height: f64) -> Option<CellRect> {
        const EPS: f64 = 1e-9;
        let min_cols = ((min_width / self.cell_width) - EPS).ceil().max(1.0) as usize;
        let min_rows = ((min_height / self.cell_height) - EPS).ceil().max(1.0) as usize;
        if min_cols > self.cols || min_rows > self.rows {
            return None;
        }

        // heights[col]: free cells stacked upward from the current row.
        let mut heights = vec![0usize; self.cols];
        let mut stack: Vec<usize> = Vec::with_capacity(self.cols + 1);
        let mut best: Option<CellRect> = None;

        for row in (0..self.rows).rev() {
            for (col, height) in heights.iter_mut().enumerate() {
                *height = if self.blocked[row * self.cols + col] {
                    0
                } else {
                    *height + 1
                };
            }

            stack.clear();
            for col in 0..=self.cols {
                let current = heights.get(col).copied().unwrap_or(0);
                while let Some(&top) = stack.last() {
                    if heights[top] < current {
                        break;
                    }
                    stack.pop();
                    let rows = heights[top];
                    let left = stack.last().map_or(0, |&i| i + 1);
                    let cols = col - left;
                    if rows < min_rows || cols < min_cols {
                        continue;
                    }
                    let candidate = CellRect {
                        col: left,
                        row,
                        cols,
                        rows,
                    };
                    if best.is_none_or(|b| candidate.preference(&b) == Ordering::Greater) {
                        best = Some(candidate);
                    }
                }
                stack.push(col);
            }
        }
        best
    }
}

/// Number of cells along one axis and the resulting cell size.
fn axis_cells(length: f64, cell_size: f64) -> (usize, f64) {
    if !(length.is_finite() && length > 0.0) {
        return (0, cell_size);
    }
    let count = (length / cell_size + 1e-9).floor() as usize;
    if count > MAX_GRID_CELLS {
        (MAX_GRID_CELLS, length / MAX_GRID_CELLS as f64)
    } else {
        (count, cell_size)
    }
}

/// Half-open index range of cells along one axis touched by `[start, end]`.
fn cell_range(start: f64, end: f64, origin: f64, size: f64, count: usize) -> Option<(usize, usize)> {
    let first = ((start - origin) / size).floor().max(0.0);
    let last = ((end - origin) / size).ceil().min(count as f64);
    (first < last).then_some((first as usize, last as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::layout::{Matrix, TextRun};

    fn letter() -> PageLayout {
        PageLayout::new(0, Rect::new(0.0, 0.0, 612.0, 792.0))
    }

    fn config() -> PlacementConfig {
        PlacementConfig::default()
    }

    fn assert_free(page: &PageLayout, region: &Rect) {
        for occupied in page.occupied() {
            let overlap_w = region.right().min(occupied.right()) - region.x.max(occupied.x);
            let overlap_h = region.top().min(occupied.top()) - region.y.max(occupied.y);
            assert!(
                overlap_w <= 1e-9 || overlap_h <= 1e-9,
                "{region:?} overlaps {occupied:?}"
            );
        }
    }

    #[test]
    fn blank_page_yields_bottom_anchored_region() {
        let page = letter();
        let cfg = config();
        let region = best_region_on_page(&page, 96.0, 96.0, &cfg).unwrap();
        assert!((region.y - cfg.page_margin).abs() < 1e-9);
        assert!((region.right() - (612.0 - cfg.page_margin)).abs() < 1e-9);
        assert!(region.width >= 96.0 && region.height >= 96.0);
        assert!(page.content_bounds(cfg.page_margin).contains(&region));
    }

    #[test]
    fn fully_covered_page_has_no_region() {
        let mut page = letter();
        page.graphics.push(Rect::new(0.0, 0.0, 612.0, 792.0));
        assert_eq!(find_empty_region(&[page], 96.0, 96.0, &config()), Placement::NotFound);
    }

    #[test]
    fn region_avoids_occupied_boxes() {
        let mut page = letter();
        // Body text across the top half and a footer line.
        page.graphics.push(Rect::new(50.0, 400.0, 500.0, 350.0));
        page.graphics.push(Rect::new(300.0, 20.0, 0.0, 40.0));
        page.text_runs.push(TextRun::new(
            "Footer".into(),
            0,
            Matrix::translate(400.0, 30.0),
            vec![(0.0, 6.0), (6.0, 12.0), (12.0, 18.0), (18.0, 24.0), (24.0, 30.0), (30.0, 36.0)],
            -2.4,
            9.6,
        ));
        let region = best_region_on_page(&page, 96.0, 96.0, &config()).unwrap();
        assert_free(&page, &region);
    }

    #[test]
    fn first_qualifying_page_wins() {
        let mut covered = letter();
        covered.graphics.push(Rect::new(0.0, 0.0, 612.0, 792.0));
        let blank = PageLayout::new(1, Rect::new(0.0, 0.0, 612.0, 792.0));
        let blank_too = PageLayout::new(2, Rect::new(0.0, 0.0, 612.0, 792.0));
        let found = find_empty_region(&[covered, blank, blank_too], 96.0, 96.0, &config());
        assert_eq!(found.region().unwrap().page, 1);
    }

    #[test]
    fn ties_prefer_bottom_then_right() {
        // A cross splits a 160pt page into four equal 64pt quadrants.
        let mut page = PageLayout::new(0, Rect::new(0.0, 0.0, 160.0, 160.0));
        page.graphics.push(Rect::new(0.0, 66.0, 160.0, 28.0));
        page.graphics.push(Rect::new(66.0, 0.0, 28.0, 160.0));
        let cfg = PlacementConfig {
            page_margin: 0.0,
            min_region_size: 48.0,
            ..config()
        };
        let region = best_region_on_page(&page, 48.0, 48.0, &cfg).unwrap();
        assert_eq!(region, Rect::new(96.0, 0.0, 64.0, 64.0));
    }

    #[test]
    fn zero_width_line_blocks_its_cells() {
        let mut page = PageLayout::new(0, Rect::new(0.0, 0.0, 200.0, 200.0));
        page.graphics.push(Rect::new(100.0, 0.0, 0.0, 200.0));
        let cfg = PlacementConfig {
            page_margin: 0.0,
            ..config()
        };
        let region = best_region_on_page(&page, 96.0, 96.0, &cfg).unwrap();
        assert!(region.right() <= 100.0 || region.x >= 100.0);
    }

    #[test]
    fn huge_pages_cap_the_grid() {
        let (cols, size) = axis_cells(20_000.0, 8.0);
        assert_eq!(cols, MAX_GRID_CELLS);
        assert!((size - 20_000.0 / 1024.0).abs() < 1e-9);
        let page = PageLayout::new(0, Rect::new(0.0, 0.0, 20_000.0, 20_000.0));
        assert!(best_region_on_page(&page, 96.0, 96.0, &config()).is_some());
    }

    #[test]
    fn search_is_deterministic() {
        let mut page = letter();
        page.graphics.push(Rect::new(100.0, 100.0, 300.0, 300.0));
        let a = best_region_on_page(&page, 96.0, 96.0, &config());
        let b = best_region_on_page(&page, 96.0, 96.0, &config());
        assert_eq!(a, b);
    }
}

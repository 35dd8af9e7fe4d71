// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Placement module — marker search, empty-region search, and stamp layout.

pub mod marker;
pub mod region;
pub mod stamp;

pub use marker::{MarkerHit, find_all_markers, find_first_marker, locate_marker, marker_region};
pub use region::{best_region_on_page, find_empty_region};
pub use stamp::{CaptionLine, CaptionPosition, StampLayout, layout_stamp};

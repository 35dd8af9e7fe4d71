// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — parsing, layout extraction, and stamping.

pub(crate) mod content;
pub mod layout;
pub mod reader;
pub mod writer;

pub use layout::{DocumentLayout, Matrix, PageLayout, TextRun};
pub use reader::PdfReader;
pub use writer::Compositor;

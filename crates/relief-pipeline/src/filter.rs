//! Foreground path filter.
//!
//! Traced documents can contain background paths (light fills around or
//! between the design). Only dark paths are extruded.

use crate::vector::{VectorDocument, VectorPath};

/// Paths brighter than this are background.
pub const MAX_FOREGROUND_BRIGHTNESS: f64 = 0.5;

/// Returns `true` if `path` is part of the design.
#[must_use]
pub fn is_foreground(path: &VectorPath) -> bool {
    path.fill.brightness() <= MAX_FOREGROUND_BRIGHTNESS
}

/// Keep only foreground paths, preserving order.
#[must_use = "returns the filtered paths"]
pub fn filter_foreground(paths: &[VectorPath]) -> Vec<VectorPath> {
    paths.iter().filter(|p| is_foreground(p)).cloned().collect()
}

/// Apply [`filter_foreground`] to a whole document.
#[must_use = "returns the filtered document"]
pub fn filter_document(document: &VectorDocument) -> VectorDocument {
    VectorDocument {
        dimensions: document.dimensions,
        paths: filter_foreground(&document.paths),
    }
}

//! Line of sight: which cells a viewer can see through an opacity grid.
//!
//! All algorithms implement the `VisibilityAlgorithm` trait.

pub mod occlusion;
pub mod shadowcast;

pub use shadowcast::ShadowCaster;

use crate::error::LightingError;
use crate::grid::Grid;

/// Trait for visibility algorithms.
///
/// Implementations return a single-channel grid of the opacity grid's plane,
/// where 1.0 = fully seen and 0.0 = hidden.
pub trait VisibilityAlgorithm {
    /// Calculate what is visible from `viewer`.
    ///
    /// # Arguments
    /// * `opacity` - Per-cell opacity (0.0 = transparent, 1.0 = blocks sight), channel 0 is read
    /// * `viewer` - Cell of the viewer (x, y)
    ///
    /// # Errors
    /// `InvalidInput` when the viewer lies outside the grid, `AlgorithmOverflow`
    /// when the algorithm cannot represent the occluders at its configured resolution.
    fn solve(&self, opacity: &Grid, viewer: (usize, usize)) -> Result<Grid, LightingError>;
}

/// Converts a visibility grid to a formatted string for debugging
pub fn visibility_to_string(visibility: &Grid) -> String {
    let mut result = String::new();
    for y in 0..visibility.height() {
        for x in 0..visibility.width() {
            result.push_str(&format!("{:5.2} ", visibility.get(x, y, 0)));
        }
        result.push('\n');
    }
    result
}

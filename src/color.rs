//! Light colors and the per-channel helpers built on them.
//!
//! Colors are not limited to [0, 1]: a torch is a few thousand units bright and
//! only the normalizer maps light back into display range.

use crate::grid::{Grid, Shape};

/// Rec. 709 luminance weights.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// RGB color with floating point components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Rgb { r, g, b }
    }

    pub fn channels(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Spread a single-channel `weights` grid into RGB, multiplying by `color`.
///
/// # Returns
/// A 3-channel grid with the plane of `weights`
pub fn tint_plane(weights: &Grid, color: Rgb) -> Grid {
    let shape = Shape::new(weights.width(), weights.height(), 3);
    let channels = color.channels();
    let mut out = Grid::zeros(shape);
    for (cell, &w) in out.data_mut().chunks_exact_mut(3).zip(weights.data()) {
        for (value, c) in cell.iter_mut().zip(channels) {
            *value = w * c;
        }
    }
    out
}

/// Converts an RGB grid to a formatted string for debugging
pub fn rgb_grid_to_string(grid: &Grid) -> String {
    let mut result = String::new();
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let c = grid.cell(x, y);
            match c {
                [r, g, b] => result.push_str(&format!("({r:.1},{g:.1},{b:.1}) ")),
                _ => result.push_str(&format!("{:.1} ", c.first().copied().unwrap_or(0.0))),
            }
        }
        result.push('\n');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_basics() {
        let color = Rgb::new(0.5, 0.75, 0.25);
        assert_eq!(color.channels(), [0.5, 0.75, 0.25]);
    }

    #[test]
    fn test_luminance_weights_sum_to_one() {
        assert!((LUMA_WEIGHTS.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_tint_plane() {
        // Full, zero, and partial weights
        let weights = Grid::from_vec(Shape::new(3, 1, 1), vec![1.0, 0.0, 0.5]).unwrap();
        let out = tint_plane(&weights, Rgb::new(10.0, 5.0, 0.0));
        assert_eq!(out.shape(), Shape::new(3, 1, 3));
        assert_eq!(out.cell(0, 0), &[10.0, 5.0, 0.0]);
        assert_eq!(out.cell(1, 0), &[0.0, 0.0, 0.0]);
        assert_eq!(out.cell(2, 0), &[5.0, 2.5, 0.0]);
    }

    #[test]
    fn test_grid_to_string() {
        let grid = Grid::filled(Shape::new(2, 1, 3), 1.0);
        assert_eq!(rgb_grid_to_string(&grid), "(1.0,1.0,1.0) (1.0,1.0,1.0) \n");
    }
}

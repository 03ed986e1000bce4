//! Compression of raw light sums into display range.
//!
//! Raw light is unbounded. Each value is scaled by a brightness factor,
//! clamped below at 1 and log-compressed, so dim light becomes exactly 0.
//! Dividing by a reference maximum then maps the result into [0, 1].

use crate::color::LUMA_WEIGHTS;
use crate::error::LightingError;
use crate::grid::{Grid, Shape};

/// Default brightness scale `k` in `log(clamp(raw * k, 1, ∞))`.
pub const DEFAULT_BRIGHTNESS: f32 = 10.0;

/// How the reference maximum is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum NormalizationMode {
    /// Divide by the maximum of the current frame; the brightest cell is always 1.0.
    #[default]
    FrameMax,
    /// Divide by the larger of the frame maximum and the previous divisor times
    /// `decay`, so the picture dims gradually when bright lights go out.
    RunningMax { decay: f32 },
}

/// `log(clamp(v * brightness, 1, ∞))` for every value.
pub fn log_compress(raw: &Grid, brightness: f32) -> Grid {
    raw.map(|v| (v * brightness).max(1.0).ln())
}

/// Log-compress `raw` and divide by its own maximum.
///
/// A grid with nothing above the clamp (no light anywhere) comes back all zero.
pub fn normalize_frame(raw: &Grid, brightness: f32) -> Grid {
    let compressed = log_compress(raw, brightness);
    scale_by_max(compressed, None).0
}

fn scale_by_max(mut compressed: Grid, floor: Option<f32>) -> (Grid, Option<f32>) {
    let frame_max = compressed.max_value();
    let divisor = floor.map_or(frame_max, |f| f.max(frame_max));
    if !(divisor.is_finite() && divisor > 0.0) {
        log::debug!("degenerate light maximum {divisor}; normalizing to zero");
        compressed.fill(0.0);
        return (compressed, None);
    }
    compressed.data_mut().iter_mut().for_each(|v| *v /= divisor);
    (compressed, Some(divisor))
}

/// Stateful normalizer; `RunningMax` remembers the divisor between frames.
#[derive(Debug, Clone)]
pub struct Normalizer {
    pub mode: NormalizationMode,
    /// Brightness scale applied before compression.
    pub brightness: f32,
    divisor: Option<f32>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer {
            mode: NormalizationMode::default(),
            brightness: DEFAULT_BRIGHTNESS,
            divisor: None,
        }
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: NormalizationMode) -> Self {
        Normalizer {
            mode,
            ..Self::default()
        }
    }

    pub fn with_brightness(brightness: f32) -> Self {
        Normalizer {
            brightness,
            ..Self::default()
        }
    }

    /// Divisor used for the last frame, if it had any light.
    pub fn divisor(&self) -> Option<f32> {
        self.divisor
    }

    /// Switch mode; the running maximum starts over.
    pub fn set_mode(&mut self, mode: NormalizationMode) {
        self.mode = mode;
        self.divisor = None;
    }

    pub fn reset(&mut self) {
        self.divisor = None;
    }

    pub fn normalize(&mut self, raw: &Grid) -> Grid {
        let compressed = log_compress(raw, self.brightness);
        let floor = match self.mode {
            NormalizationMode::FrameMax => None,
            NormalizationMode::RunningMax { decay } => self.divisor.map(|d| d * decay),
        };
        let (normalized, divisor) = scale_by_max(compressed, floor);
        self.divisor = divisor;
        normalized
    }
}

/// Rec. 709 luminance of a 3-channel grid.
pub fn luminance_grid(grid: &Grid) -> Result<Grid, LightingError> {
    grid.check_shape(grid.shape().with_channels(3))?;
    let mut out = Grid::zeros(Shape::new(grid.width(), grid.height(), 1));
    for (value, cell) in out.data_mut().iter_mut().zip(grid.data().chunks_exact(3)) {
        *value = cell.iter().zip(LUMA_WEIGHTS).map(|(c, w)| c * w).sum();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn row(values: &[f32]) -> Grid {
        Grid::from_vec(Shape::new(values.len(), 1, 1), values.to_vec()).unwrap()
    }

    #[test]
    fn brightest_cell_maps_to_one() {
        let out = normalize_frame(&row(&[0.0, 0.05, 1.0, 100.0]), 10.0);
        assert_eq!(out.data()[0], 0.0);
        // 0.05 * 10 is below the clamp.
        assert_eq!(out.data()[1], 0.0);
        assert!((out.data()[2] - 10f32.ln() / 1000f32.ln()).abs() < 1e-6);
        assert_eq!(out.data()[3], 1.0);
    }

    #[rstest]
    #[case(&[0.0, 0.0, 0.0])]
    #[case(&[0.01, 0.05, 0.09])]
    fn darkness_normalizes_to_zero(#[case] values: &[f32]) {
        let out = normalize_frame(&row(values), 10.0);
        assert!(out.data().iter().all(|&v| v == 0.0));

        let mut normalizer = Normalizer::with_mode(NormalizationMode::RunningMax { decay: 0.9 });
        let out = normalizer.normalize(&row(values));
        assert!(out.data().iter().all(|&v| v == 0.0));
        assert_eq!(normalizer.divisor(), None);
    }

    #[test]
    fn frame_max_forgets_previous_frames() {
        let mut normalizer = Normalizer::new();
        normalizer.normalize(&row(&[1000.0, 0.0]));
        let out = normalizer.normalize(&row(&[1.0, 0.0]));
        assert_eq!(out.data()[0], 1.0);
    }

    #[test]
    fn running_max_dims_gradually() {
        let mut normalizer = Normalizer::with_mode(NormalizationMode::RunningMax { decay: 0.5 });
        normalizer.normalize(&row(&[1000.0, 0.0]));
        let first_divisor = normalizer.divisor().unwrap();
        assert!((first_divisor - 10_000f32.ln()).abs() < 1e-4);

        let out = normalizer.normalize(&row(&[1.0, 0.0]));
        assert!((normalizer.divisor().unwrap() - first_divisor * 0.5).abs() < 1e-4);
        assert!(out.data()[0] < 1.0 && out.data()[0] > 0.0);

        // A brighter frame takes over immediately.
        let out = normalizer.normalize(&row(&[1e6, 0.0]));
        assert_eq!(out.data()[0], 1.0);
    }

    #[test]
    fn luminance_of_rgb_grid() {
        let grid = Grid::from_vec(Shape::new(2, 1, 3), vec![1.0, 1.0, 1.0, 0.0, 1.0, 0.0]).unwrap();
        let lum = luminance_grid(&grid).unwrap();
        assert_eq!(lum.shape(), Shape::new(2, 1, 1));
        assert!((lum.data()[0] - 1.0).abs() < 1e-6);
        assert!((lum.data()[1] - 0.7152).abs() < 1e-6);
        assert!(luminance_grid(&row(&[1.0])).is_err());
    }
}

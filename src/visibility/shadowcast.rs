//! Shadow casting through an angular occlusion buffer.
//!
//! The solve runs in two phases:
//! 1. Every opaque cell, nearest first, projects a wedge of shadow into the
//!    [`AngularBuffer`]. A wall's wedge is stretched to meet each adjoining
//!    wall, so contiguous walls cast one unbroken shadow instead of a fan of
//!    per-cell wedges with seams between them.
//! 2. Every cell is sampled against the buffer: a sample is hidden when a
//!    strictly closer wedge from another cell covers its direction.
//!
//! Key choices:
//! - Wedges are computed in unwrapped angle space around each occluder's own
//!   direction and only folded onto the periodic buffer when stored
//! - Opaque targets are sampled at the point of their footprint closest to the
//!   viewer, so wall faces stay visible at grazing angles
//! - Output rows are sampled in parallel using rayon

use rayon::prelude::*;

use super::VisibilityAlgorithm;
use super::occlusion::{AngularBuffer, Span, wrap_angle};
use crate::error::LightingError;
use crate::grid::{Grid, Shape};

/// Axis directions in which a wall looks for an adjoining wall.
const NEIGHBORS: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Shadow casting visibility solver.
#[derive(Debug, Clone)]
pub struct ShadowCaster {
    /// Number of angular slots in the occlusion buffer.
    pub resolution: usize,
    /// Most spans one slot may hold before the solve fails with `AlgorithmOverflow`.
    pub slot_capacity: usize,
    /// Cells at or above this opacity block sight.
    pub opaque_threshold: f32,
    /// Distance (in cells) a wall's wedge reaches toward an adjoining wall.
    /// Slightly over half a cell so neighbouring wedges overlap.
    pub join_reach: f32,
    /// Half-width (in cells) of a wall face with no adjoining wall.
    pub face_extent: f32,
    /// Samples per axis for transparent cells; above 1 gives fractional values on shadow edges.
    pub supersample: usize,
}

impl Default for ShadowCaster {
    fn default() -> Self {
        ShadowCaster {
            resolution: 2048,
            slot_capacity: 128,
            opaque_threshold: 0.5,
            join_reach: 1.0 / 1.95,
            face_extent: 0.5,
            supersample: 1,
        }
    }
}

impl ShadowCaster {
    /// Create a new ShadowCaster with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolution(resolution: usize, slot_capacity: usize) -> Self {
        ShadowCaster {
            resolution,
            slot_capacity,
            ..Self::default()
        }
    }

    pub fn with_supersample(supersample: usize) -> Self {
        ShadowCaster {
            supersample,
            ..Self::default()
        }
    }

    #[inline]
    fn is_opaque(&self, opacity: &Grid, x: i64, y: i64) -> bool {
        opacity.shape().contains(x, y)
            && opacity.get(x as usize, y as usize, 0) >= self.opaque_threshold
    }

    /// Phase 1: project every occluder into a fresh buffer.
    fn cast_shadows(
        &self,
        opacity: &Grid,
        viewer: (usize, usize),
    ) -> Result<AngularBuffer, LightingError> {
        let width = opacity.width();
        let (vx, vy) = (viewer.0 as f32, viewer.1 as f32);

        let mut occluders: Vec<(f32, usize, usize)> = Vec::new();
        for y in 0..opacity.height() {
            for x in 0..width {
                if (x, y) != viewer && self.is_opaque(opacity, x as i64, y as i64) {
                    let depth = (x as f32 - vx).hypot(y as f32 - vy);
                    occluders.push((depth, x, y));
                }
            }
        }
        occluders.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut buffer = AngularBuffer::new(self.resolution, self.slot_capacity)?;
        for &(depth, x, y) in &occluders {
            let (lo, hi) = self.silhouette(opacity, viewer, x, y);
            buffer.insert(Span {
                lo,
                hi,
                depth,
                cell: y * width + x,
            })?;
        }
        log::debug!(
            "cast {} occluders into {} spans ({} slots) from {:?}",
            occluders.len(),
            buffer.span_count(),
            buffer.resolution(),
            viewer
        );
        Ok(buffer)
    }

    /// Angular interval occluded by the wall at `(x, y)`, unwrapped around its
    /// center direction so `lo <= hi` even when it straddles ±π.
    fn silhouette(&self, opacity: &Grid, viewer: (usize, usize), x: usize, y: usize) -> (f32, f32) {
        let dx = x as f32 - viewer.0 as f32;
        let dy = y as f32 - viewer.1 as f32;
        let center = dy.atan2(dx);
        let (mut lo, mut hi) = (center, center);

        for (sx, sy) in NEIGHBORS {
            let joined = self.is_opaque(opacity, x as i64 + sx, y as i64 + sy);
            let reach = if joined { self.join_reach } else { self.face_extent };
            let px = dx + sx as f32 * reach;
            let py = dy + sy as f32 * reach;
            let angle = center + wrap_angle(py.atan2(px) - center);
            lo = lo.min(angle);
            hi = hi.max(angle);
        }
        (lo, hi)
    }

    /// Phase 2: fraction of a cell's samples that are not behind a closer wedge.
    fn sample_cell(
        &self,
        buffer: &AngularBuffer,
        opacity: &Grid,
        viewer: (usize, usize),
        x: usize,
        y: usize,
    ) -> f32 {
        if (x, y) == viewer {
            return 1.0;
        }
        let (vx, vy) = (viewer.0 as f32, viewer.1 as f32);
        let cell = y * opacity.width() + x;
        let seen = |px: f32, py: f32| {
            let (dx, dy) = (px - vx, py - vy);
            !buffer.occluded(dy.atan2(dx), dx.hypot(dy), cell)
        };

        if self.is_opaque(opacity, x as i64, y as i64) {
            let px = vx.clamp(x as f32 - 0.5, x as f32 + 0.5);
            let py = vy.clamp(y as f32 - 0.5, y as f32 + 0.5);
            return if seen(px, py) { 1.0 } else { 0.0 };
        }

        let n = self.supersample.max(1);
        let step = 1.0 / n as f32;
        let mut visible = 0usize;
        for i in 0..n {
            for j in 0..n {
                let px = x as f32 - 0.5 + (i as f32 + 0.5) * step;
                let py = y as f32 - 0.5 + (j as f32 + 0.5) * step;
                if seen(px, py) {
                    visible += 1;
                }
            }
        }
        visible as f32 / (n * n) as f32
    }
}

impl VisibilityAlgorithm for ShadowCaster {
    fn solve(&self, opacity: &Grid, viewer: (usize, usize)) -> Result<Grid, LightingError> {
        let shape = opacity.shape();
        if !shape.contains(viewer.0 as i64, viewer.1 as i64) {
            return Err(LightingError::out_of_bounds(
                viewer.0 as i64,
                viewer.1 as i64,
                shape,
            ));
        }
        if self.supersample == 0 {
            return Err(LightingError::invalid_parameter("supersample", "at least 1", 0.0));
        }

        let buffer = self.cast_shadows(opacity, viewer)?;

        let width = shape.width;
        let mut visibility = Grid::zeros(Shape::new(width, shape.height, 1));
        visibility
            .data_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, value) in row.iter_mut().enumerate() {
                    *value = self.sample_cell(&buffer, opacity, viewer, x, y);
                }
            });
        Ok(visibility)
    }
}

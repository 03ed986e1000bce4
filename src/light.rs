//! Light sources and their accumulation into one combined light grid.
//!
//! Each light keeps two derived grids: its shadow mask (what it can reach)
//! and its contribution (the light it casts). Both are published as
//! [`SharedGrid`]s and only replaced when something they depend on changes,
//! so an unchanged light hands the same grid identity to the sum cache frame
//! after frame.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::cache::{GridSumCache, SumStats};
use crate::color::{Rgb, tint_plane};
use crate::error::LightingError;
use crate::grid::{Grid, Shape, SharedGrid};
use crate::visibility::VisibilityAlgorithm;

/// Default constant added to the squared distance. It keeps the light finite
/// at its own cell and stands in for the height of the flame above the floor.
pub const DEFAULT_DISTANCE_OFFSET: f32 = 1.0;

/// Stable handle of a light within a [`LightSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(u64);

/// Per-cell light cast by one source.
///
/// Every channel of cell `(x, y)` is `shadow(x, y) / (d² + distance_offset) * color`,
/// where `d` is the distance from `position` to the cell center.
///
/// # Returns
/// A 3-channel grid with the plane of `shadow`, or `InvalidInput` unless
/// `distance_offset` is finite and positive
pub fn contribution_grid(
    position: (f32, f32),
    color: Rgb,
    shadow: &Grid,
    distance_offset: f32,
) -> Result<Grid, LightingError> {
    check_distance_offset(distance_offset)?;
    let width = shadow.width();
    let mut weights = Grid::zeros(Shape::new(width, shadow.height(), 1));
    if width == 0 {
        return Ok(tint_plane(&weights, color));
    }
    weights
        .data_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let dy = y as f32 - position.1;
            for (x, weight) in row.iter_mut().enumerate() {
                let dx = x as f32 - position.0;
                *weight = shadow.get(x, y, 0) / (dx * dx + dy * dy + distance_offset);
            }
        });
    Ok(tint_plane(&weights, color))
}

/// A zero offset divides by zero at the light's own cell.
fn check_distance_offset(distance_offset: f32) -> Result<(), LightingError> {
    if distance_offset.is_finite() && distance_offset > 0.0 {
        Ok(())
    } else {
        Err(LightingError::invalid_parameter(
            "distance_offset",
            "finite and positive",
            distance_offset,
        ))
    }
}

/// A point light.
#[derive(Debug, Clone)]
pub struct LightSource {
    position: (f32, f32),
    color: Rgb,
    lit: bool,
    carried: bool,
    shadow: Option<SharedGrid>,
    contribution: Option<SharedGrid>,
}

impl LightSource {
    /// A lit light standing at `position`.
    pub fn new(position: (f32, f32), color: Rgb) -> Self {
        LightSource {
            position,
            color,
            lit: true,
            carried: false,
            shadow: None,
            contribution: None,
        }
    }

    /// A lit light carried by the viewer; it follows the viewer and shares its line of sight.
    pub fn carried(color: Rgb) -> Self {
        LightSource {
            carried: true,
            ..Self::new((0.0, 0.0), color)
        }
    }

    pub fn position(&self) -> (f32, f32) {
        self.position
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn is_carried(&self) -> bool {
        self.carried
    }

    pub fn shadow_mask(&self) -> Option<&SharedGrid> {
        self.shadow.as_ref()
    }

    pub fn contribution(&self) -> Option<&SharedGrid> {
        self.contribution.as_ref()
    }

    /// Moving a light invalidates its shadow mask and contribution.
    pub fn set_position(&mut self, position: (f32, f32)) {
        if position != self.position {
            self.position = position;
            self.invalidate_shadow();
        }
    }

    pub fn set_color(&mut self, color: Rgb) {
        if color != self.color {
            self.color = color;
            self.contribution = None;
        }
    }

    /// An unlit light keeps its derived grids so relighting it in place is free.
    pub fn set_lit(&mut self, lit: bool) {
        self.lit = lit;
    }

    /// Supply a shadow mask solved elsewhere. Passing the mask already in use
    /// changes nothing.
    pub fn set_shadow_mask(&mut self, mask: SharedGrid) {
        if self.shadow.as_ref().is_some_and(|s| s.id() == mask.id()) {
            return;
        }
        self.shadow = Some(mask);
        self.contribution = None;
    }

    /// Drop the shadow mask (and with it the contribution), e.g. after the map changed.
    pub fn invalidate_shadow(&mut self) {
        self.shadow = None;
        self.contribution = None;
    }

    /// The cell containing the light, for a map of `shape`.
    pub fn cell_in(&self, shape: Shape) -> Result<(usize, usize), LightingError> {
        let x = self.position.0.round() as i64;
        let y = self.position.1.round() as i64;
        if !shape.contains(x, y) {
            return Err(LightingError::out_of_bounds(x, y, shape));
        }
        Ok((x as usize, y as usize))
    }

    fn is_stale(&self, plane: Shape) -> bool {
        self.contribution
            .as_ref()
            .is_none_or(|c| c.shape().plane() != plane)
    }

    fn refresh<A>(
        &mut self,
        opacity: &Grid,
        solver: &A,
        distance_offset: f32,
    ) -> Result<(), LightingError>
    where
        A: VisibilityAlgorithm + ?Sized,
    {
        let plane = opacity.shape().plane();
        let shadow = match self.shadow.clone() {
            Some(mask) if mask.shape() == plane => mask,
            _ => {
                let mask = SharedGrid::new(solver.solve(opacity, self.cell_in(plane)?)?);
                self.shadow = Some(mask.clone());
                mask
            }
        };
        let contribution = contribution_grid(self.position, self.color, &shadow, distance_offset)?;
        log::trace!(
            "refreshed light at {:?}: shadow {:?}, peak {:.2}",
            self.position,
            shadow.id(),
            contribution.max_value()
        );
        self.contribution = Some(SharedGrid::new(contribution));
        Ok(())
    }
}

/// The lights of one scene and the cache that sums them.
#[derive(Debug)]
pub struct LightSet {
    lights: BTreeMap<LightId, LightSource>,
    next_id: u64,
    cache: GridSumCache,
    distance_offset: f32,
}

impl Default for LightSet {
    fn default() -> Self {
        LightSet {
            lights: BTreeMap::new(),
            next_id: 0,
            cache: GridSumCache::new(),
            distance_offset: DEFAULT_DISTANCE_OFFSET,
        }
    }
}

impl LightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails unless `distance_offset` is finite and positive.
    pub fn with_distance_offset(distance_offset: f32) -> Result<Self, LightingError> {
        check_distance_offset(distance_offset)?;
        Ok(LightSet {
            distance_offset,
            ..Self::default()
        })
    }

    pub fn add(&mut self, light: LightSource) -> LightId {
        let id = LightId(self.next_id);
        self.next_id += 1;
        self.lights.insert(id, light);
        id
    }

    pub fn remove(&mut self, id: LightId) -> Option<LightSource> {
        self.lights.remove(&id)
    }

    pub fn get(&self, id: LightId) -> Option<&LightSource> {
        self.lights.get(&id)
    }

    pub fn get_mut(&mut self, id: LightId) -> Option<&mut LightSource> {
        self.lights.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (LightId, &LightSource)> {
        self.lights.iter().map(|(&id, light)| (id, light))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (LightId, &mut LightSource)> {
        self.lights.iter_mut().map(|(&id, light)| (id, light))
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn distance_offset(&self) -> f32 {
        self.distance_offset
    }

    /// Changing the offset changes every contribution. A rejected offset leaves
    /// the set as it was.
    pub fn set_distance_offset(&mut self, distance_offset: f32) -> Result<(), LightingError> {
        check_distance_offset(distance_offset)?;
        if distance_offset != self.distance_offset {
            self.distance_offset = distance_offset;
            for light in self.lights.values_mut() {
                light.contribution = None;
            }
        }
        Ok(())
    }

    /// Drop every shadow mask, for when the map's opacity changed.
    pub fn invalidate_shadows(&mut self) {
        for light in self.lights.values_mut() {
            light.invalidate_shadow();
        }
    }

    /// Statistics of the last summation that reached the cache.
    pub fn cache_stats(&self) -> Option<SumStats> {
        self.cache.last_stats()
    }

    /// Sum of the contributions of every lit light inside the map.
    ///
    /// Stale contributions are recomputed first, in parallel. Unlit lights are
    /// left out of the sum entirely; when none is lit the result is an all-zero
    /// 3-channel grid and the cache is not consulted.
    pub fn combined<A>(&mut self, opacity: &Grid, solver: &A) -> Result<Grid, LightingError>
    where
        A: VisibilityAlgorithm + Sync + ?Sized,
    {
        let plane = opacity.shape().plane();
        let offset = self.distance_offset;

        let mut active = Vec::new();
        for (&id, light) in &self.lights {
            if !light.lit {
                continue;
            }
            match light.cell_in(plane) {
                Ok(_) => active.push(id),
                Err(e) => log::warn!("skipping light {id:?}: {e}"),
            }
        }

        let stale: Vec<&mut LightSource> = self
            .lights
            .iter_mut()
            .filter(|(id, light)| active.contains(*id) && light.is_stale(plane))
            .map(|(_, light)| light)
            .collect();
        if !stale.is_empty() {
            log::debug!("refreshing {} of {} active lights", stale.len(), active.len());
        }
        stale
            .into_par_iter()
            .try_for_each(|light| light.refresh(opacity, solver, offset))?;

        let grids: Vec<SharedGrid> = active
            .iter()
            .filter_map(|id| self.lights.get(id))
            .filter_map(|light| light.contribution.clone())
            .collect();
        if grids.is_empty() {
            return Ok(Grid::zeros(plane.with_channels(3)));
        }
        self.cache.sum(&grids)
    }
}

//! Incremental summation of grids that mostly repeat from call to call.
//!
//! Inputs are recognised by [`GridId`], never by value. The cache remembers
//! the partial sum of the grids that were repeated on the previous call and
//! reuses it verbatim while every one of those grids is still being summed.
//! As soon as one of them goes missing the partial sum is thrown away; there is
//! no per-grid bookkeeping that would let it be patched.
//!
//! Grids sent for the first time are added to the result but kept out of the
//! cached sum until they show up a second time in a row.

use std::collections::BTreeMap;

use crate::error::{InputError, LightingError};
use crate::grid::{Grid, GridId, Shape, SharedGrid};

/// Work done by one [`GridSumCache::sum`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SumStats {
    /// Inputs covered by the reused partial sum.
    pub used_from_cache: usize,
    /// Inputs making up the partial sum kept for the next call.
    pub stored_in_cache: usize,
    /// Inputs added one by one during this call.
    pub summed: usize,
}

/// One summation context. Independent scenes should each own one.
#[derive(Debug, Default)]
pub struct GridSumCache {
    /// Multiplicity of every input of the previous call.
    last_inputs: BTreeMap<GridId, usize>,
    /// Grids inside `cached_sum`, kept alive so their ids cannot be reissued
    /// while the sum still depends on them.
    cached: BTreeMap<GridId, (SharedGrid, usize)>,
    cached_sum: Option<Grid>,
    last_stats: Option<SumStats>,
}

impl GridSumCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics of the most recent successful call.
    pub fn last_stats(&self) -> Option<SumStats> {
        self.last_stats
    }

    /// Forget all history; the next call sums everything from scratch.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Elementwise sum of `grids`. The same grid may appear more than once and
    /// is then counted once per appearance.
    ///
    /// # Errors
    /// `InvalidInput` when `grids` is empty or the grids differ in shape. The
    /// cache is left untouched in that case.
    pub fn sum(&mut self, grids: &[SharedGrid]) -> Result<Grid, LightingError> {
        let first = grids.first().ok_or(InputError::Empty)?;
        let shape = first.shape();
        for grid in grids {
            grid.check_shape(shape)?;
        }

        let mut counts: BTreeMap<GridId, (&SharedGrid, usize)> = BTreeMap::new();
        for grid in grids {
            counts.entry(grid.id()).or_insert((grid, 0)).1 += 1;
        }

        let reusable = self
            .cached
            .iter()
            .all(|(id, (_, n))| counts.get(id).is_some_and(|&(_, m)| m >= *n));
        let (mut total, mut cached, used_from_cache) = if reusable {
            let used = self.cached.values().map(|&(_, n)| n).sum();
            (
                self.cached_sum.take(),
                std::mem::take(&mut self.cached),
                used,
            )
        } else {
            (None, BTreeMap::new(), 0)
        };

        // Inputs still to add, with the copies already inside the cached sum removed.
        let remaining: Vec<(&SharedGrid, usize)> = counts
            .values()
            .filter_map(|&(grid, n)| {
                let covered = cached.get(&grid.id()).map_or(0, |&(_, c)| c);
                (n > covered).then(|| (grid, n - covered))
            })
            .collect();

        let mut summed = 0;
        let (repeated, fresh): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|(grid, _)| self.last_inputs.contains_key(&grid.id()));

        for &(grid, n) in &repeated {
            accumulate(&mut total, grid, n, shape)?;
            cached.entry(grid.id()).or_insert_with(|| (grid.clone(), 0)).1 += n;
            summed += n;
        }
        let stored_in_cache = cached.values().map(|&(_, n)| n).sum();
        self.cached_sum = total.clone();
        self.cached = cached;

        for &(grid, n) in &fresh {
            accumulate(&mut total, grid, n, shape)?;
            summed += n;
        }

        self.last_inputs = counts.iter().map(|(&id, &(_, n))| (id, n)).collect();
        let stats = SumStats {
            used_from_cache,
            stored_in_cache,
            summed,
        };
        log::debug!(
            "summed {} grids: {} from cache, {} added, {} cached for next call",
            grids.len(),
            stats.used_from_cache,
            stats.summed,
            stats.stored_in_cache
        );
        self.last_stats = Some(stats);

        Ok(total.unwrap_or_else(|| Grid::zeros(shape)))
    }
}

/// Add `n` copies of `grid` into the running total, starting it if needed.
fn accumulate(
    total: &mut Option<Grid>,
    grid: &Grid,
    n: usize,
    shape: Shape,
) -> Result<(), LightingError> {
    let sum = total.get_or_insert_with(|| Grid::zeros(shape));
    for _ in 0..n {
        sum.add_assign(grid)?;
    }
    Ok(())
}

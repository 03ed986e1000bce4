//! Angular occlusion buffer.
//!
//! The circle of directions around the viewer is cut into `resolution` equal
//! slots covering `[-π, π)`. Each slot keeps the occluding spans that touch it.
//! Spans arrive in unwrapped angle space (an interval may run past ±π) and are
//! folded into the periodic slot range one slot at a time as they are stored,
//! so a wedge straddling the seam lands in the last and first slots with the
//! same coverage it would have anywhere else.
//!
//! Spans must be inserted nearest first. A span whose share of a slot is
//! already covered by nearer spans cannot hide anything new there and is dropped.

use std::f32::consts::{PI, TAU};

use crate::error::LightingError;

/// An occluded angular interval `[lo, hi]` at a given depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub lo: f32,
    pub hi: f32,
    pub depth: f32,
    /// Flat index of the cell that casts this span; it never hides itself.
    pub cell: usize,
}

#[derive(Debug, Clone)]
pub struct AngularBuffer {
    resolution: usize,
    capacity: usize,
    slot_width: f32,
    slots: Vec<Vec<Span>>,
}

impl AngularBuffer {
    /// A buffer of `resolution` slots holding up to `capacity` spans each; both must be nonzero.
    pub fn new(resolution: usize, capacity: usize) -> Result<Self, LightingError> {
        if resolution == 0 {
            return Err(LightingError::invalid_parameter("resolution", "at least 1", 0.0));
        }
        if capacity == 0 {
            return Err(LightingError::invalid_parameter("slot_capacity", "at least 1", 0.0));
        }
        Ok(AngularBuffer {
            resolution,
            capacity,
            slot_width: TAU / resolution as f32,
            slots: vec![Vec::new(); resolution],
        })
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Spans currently stored across all slots.
    pub fn span_count(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    /// Unwrapped slot number of an angle; may be negative or past `resolution`.
    #[inline]
    fn slot_of(&self, angle: f32) -> i64 {
        ((angle + PI) / self.slot_width).floor() as i64
    }

    /// Fold an unwrapped slot number into range, returning the slot and the
    /// angle shift (a multiple of 2π) that moves its contents into `[-π, π)`.
    #[inline]
    fn fold(&self, unwrapped: i64) -> (usize, f32) {
        let n = self.resolution as i64;
        let slot = unwrapped.rem_euclid(n);
        let turns = (slot - unwrapped) / n;
        (slot as usize, turns as f32 * TAU)
    }

    #[inline]
    fn bounds(&self, slot: usize) -> (f32, f32) {
        let lo = -PI + slot as f32 * self.slot_width;
        (lo, lo + self.slot_width)
    }

    /// Record an occluding span. `span.lo <= span.hi` must hold.
    pub fn insert(&mut self, span: Span) -> Result<(), LightingError> {
        let first = self.slot_of(span.lo);
        // An interval wider than the full circle would otherwise visit slots twice.
        let last = self
            .slot_of(span.hi)
            .min(first + self.resolution as i64 - 1);

        for unwrapped in first..=last {
            let (slot, shift) = self.fold(unwrapped);
            let stored = Span {
                lo: span.lo + shift,
                hi: span.hi + shift,
                ..span
            };
            let (slot_lo, slot_hi) = self.bounds(slot);
            let spans = &mut self.slots[slot];
            if covered(spans, stored.lo.max(slot_lo), stored.hi.min(slot_hi)) {
                continue;
            }
            if spans.len() >= self.capacity {
                return Err(LightingError::AlgorithmOverflow {
                    slot,
                    resolution: self.resolution,
                    capacity: self.capacity,
                });
            }
            spans.push(stored);
        }
        Ok(())
    }

    /// Whether a point at `angle` (in `[-π, π]`) and `depth` lies behind a span
    /// cast by some cell other than `cell`.
    pub fn occluded(&self, angle: f32, depth: f32, cell: usize) -> bool {
        let (slot, shift) = self.fold(self.slot_of(angle));
        let angle = angle + shift;
        self.slots[slot]
            .iter()
            .any(|s| s.cell != cell && s.depth < depth && s.lo <= angle && angle <= s.hi)
    }
}

/// Whether the union of `spans` covers `[lo, hi]`.
fn covered(spans: &[Span], lo: f32, hi: f32) -> bool {
    let mut reach = lo;
    loop {
        let next = spans
            .iter()
            .filter(|s| s.lo <= reach)
            .map(|s| s.hi)
            .fold(f32::NEG_INFINITY, f32::max);
        if next >= hi {
            return true;
        }
        if next <= reach {
            return false;
        }
        reach = next;
    }
}

/// Wrap an angle difference into `[-π, π)`.
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

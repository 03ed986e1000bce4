//! Fog of war: a slowly fading memory of everything seen so far.

use crate::error::LightingError;
use crate::grid::Grid;

/// Default per-frame memory decay.
pub const DEFAULT_DECAY: f32 = 0.999;

/// What the memory keeps of the live image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryMode {
    /// Every channel is remembered on its own.
    #[default]
    PerChannel,
    /// Only the brightest channel of a cell is remembered, stored in `channel`,
    /// so remembered terrain shows as a single-hue afterimage.
    Tinted { channel: usize },
}

/// Advance `memory` by one frame and return the blended image.
///
/// In order: `memory *= decay`, then refresh from `live_sight` (elementwise max,
/// never dimming), then `blended = memory * (1 - visibility) + live_sight`.
/// `visibility` is the single-channel plane of `live_sight`; `memory` has the
/// shape of `live_sight`. For `Tinted`, a channel past the last is clamped to the last.
/// A `decay` outside `[0, 1]` is rejected before `memory` is touched.
pub fn blend_memory(
    memory: &mut Grid,
    live_sight: &Grid,
    visibility: &Grid,
    decay: f32,
    mode: MemoryMode,
) -> Result<Grid, LightingError> {
    check_decay(decay)?;
    let shape = live_sight.shape();
    memory.check_shape(shape)?;
    visibility.check_shape(shape.plane())?;
    let channels = shape.channels;
    if channels == 0 {
        return Ok(live_sight.clone());
    }

    memory.data_mut().iter_mut().for_each(|m| *m *= decay);

    let cells = memory
        .data_mut()
        .chunks_exact_mut(channels)
        .zip(live_sight.data().chunks_exact(channels));
    match mode {
        MemoryMode::PerChannel => {
            for (remembered, seen) in cells {
                for (m, &s) in remembered.iter_mut().zip(seen) {
                    *m = m.max(s);
                }
            }
        }
        MemoryMode::Tinted { channel } => {
            let channel = channel.min(channels - 1);
            for (remembered, seen) in cells {
                let brightest = seen.iter().copied().fold(0.0, f32::max);
                remembered[channel] = remembered[channel].max(brightest);
            }
        }
    }

    let mut blended = live_sight.clone();
    for ((out, remembered), &v) in blended
        .data_mut()
        .chunks_exact_mut(channels)
        .zip(memory.data().chunks_exact(channels))
        .zip(visibility.data())
    {
        for (o, &m) in out.iter_mut().zip(remembered) {
            *o += m * (1.0 - v);
        }
    }
    Ok(blended)
}

/// Above 1 hidden memory would brighten; below 0 it would flip sign.
fn check_decay(decay: f32) -> Result<(), LightingError> {
    if (0.0..=1.0).contains(&decay) {
        Ok(())
    } else {
        Err(LightingError::invalid_parameter("decay", "within [0, 1]", decay))
    }
}

/// Owns the memory grid across frames.
#[derive(Debug, Clone)]
pub struct MemoryBlender {
    pub decay: f32,
    pub mode: MemoryMode,
    memory: Option<Grid>,
}

impl Default for MemoryBlender {
    fn default() -> Self {
        MemoryBlender {
            decay: DEFAULT_DECAY,
            mode: MemoryMode::default(),
            memory: None,
        }
    }
}

impl MemoryBlender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decay(decay: f32) -> Result<Self, LightingError> {
        check_decay(decay)?;
        Ok(MemoryBlender {
            decay,
            ..Self::default()
        })
    }

    pub fn with_mode(mode: MemoryMode) -> Self {
        MemoryBlender {
            mode,
            ..Self::default()
        }
    }

    pub fn memory(&self) -> Option<&Grid> {
        self.memory.as_ref()
    }

    /// Forget everything seen so far.
    pub fn reset(&mut self) {
        self.memory = None;
    }

    /// Switching mode clears the memory, since the two modes store different images.
    pub fn set_mode(&mut self, mode: MemoryMode) {
        if mode != self.mode {
            self.mode = mode;
            self.reset();
        }
    }

    /// Advance one frame. A memory of another shape is discarded first.
    pub fn update(&mut self, live_sight: &Grid, visibility: &Grid) -> Result<Grid, LightingError> {
        let shape = live_sight.shape();
        if self.memory.as_ref().is_some_and(|m| m.shape() != shape) {
            log::debug!("frame shape changed to {shape}; memory cleared");
            self.memory = None;
        }
        let memory = self.memory.get_or_insert_with(|| Grid::zeros(shape));
        blend_memory(memory, live_sight, visibility, self.decay, self.mode)
    }
}

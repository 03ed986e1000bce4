//! Line of sight, lighting and fog of war for tile-grid worlds.
//!
//! One frame runs opacity → visibility → light sum → normalization → memory.
//! [`Scene`] drives the whole pipeline; the stages are usable on their own.

pub mod cache;
pub mod color;
pub mod demo;
pub mod error;
pub mod grid;
pub mod interactive;
pub mod light;
pub mod memory;
pub mod normalize;
pub mod render;
pub mod scene;
pub mod terrain;
pub mod visibility;

#[cfg(test)]
mod tests;

// Re-export public API
pub use cache::{GridSumCache, SumStats};
pub use color::{Rgb, rgb_grid_to_string};
pub use error::{InputError, LightingError};
pub use grid::{Grid, GridId, Shape, SharedGrid};
pub use interactive::{InteractiveViewer, ViewerConfig};
pub use light::{LightId, LightSet, LightSource, contribution_grid};
pub use memory::{MemoryBlender, MemoryMode, blend_memory};
pub use normalize::{NormalizationMode, Normalizer, luminance_grid, normalize_frame};
pub use render::{pack_rgb, save_ppm, to_byte};
pub use scene::{Frame, Scene, SceneConfig};
pub use terrain::{BlockId, BlockType, BlockTypes, Terrain};
pub use visibility::{ShadowCaster, VisibilityAlgorithm, visibility_to_string};

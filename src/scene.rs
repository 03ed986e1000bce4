//! The per-frame pipeline tying terrain, viewer, lights and memory together.
//!
//! Derived grids are computed lazily and kept until an input they depend on
//! changes:
//! - visibility depends on the viewer position and the terrain
//! - normalized light depends on the lights, the viewer (carried lights follow
//!   it) and the terrain
//!
//! Memory is the exception: it advances once per [`Scene::frame`] call.

use crate::error::LightingError;
use crate::grid::{Grid, SharedGrid};
use crate::light::{DEFAULT_DISTANCE_OFFSET, LightId, LightSet, LightSource};
use crate::memory::{DEFAULT_DECAY, MemoryBlender, MemoryMode};
use crate::normalize::{DEFAULT_BRIGHTNESS, NormalizationMode, Normalizer};
use crate::terrain::{BlockId, Terrain};
use crate::visibility::{ShadowCaster, VisibilityAlgorithm};

/// Tunables of a [`Scene`].
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub solver: ShadowCaster,
    /// Brightness scale applied before log compression.
    pub brightness: f32,
    pub normalization: NormalizationMode,
    pub memory_decay: f32,
    pub memory_mode: MemoryMode,
    pub distance_offset: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            solver: ShadowCaster::default(),
            brightness: DEFAULT_BRIGHTNESS,
            normalization: NormalizationMode::default(),
            memory_decay: DEFAULT_DECAY,
            memory_mode: MemoryMode::default(),
            distance_offset: DEFAULT_DISTANCE_OFFSET,
        }
    }
}

impl SceneConfig {
    pub fn with_solver(solver: ShadowCaster) -> Self {
        SceneConfig {
            solver,
            ..Self::default()
        }
    }
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Line of sight of the viewer, single channel.
    pub visibility: SharedGrid,
    /// Normalized light in [0, 1], three channels.
    pub light: Grid,
    /// `light` masked by `visibility`.
    pub sight: Grid,
    /// Live sight over the fading memory.
    pub blended: Grid,
}

#[derive(Debug)]
pub struct Scene {
    terrain: Terrain,
    viewer: (usize, usize),
    solver: ShadowCaster,
    lights: LightSet,
    normalizer: Normalizer,
    memory: MemoryBlender,
    visibility: Option<SharedGrid>,
    light: Option<Grid>,
}

impl Scene {
    /// Fails when the viewer is outside the map or `config` holds an unusable
    /// memory decay or distance offset.
    pub fn new(
        terrain: Terrain,
        viewer: (usize, usize),
        config: SceneConfig,
    ) -> Result<Self, LightingError> {
        check_in_map(&terrain, viewer)?;
        let mut normalizer = Normalizer::with_brightness(config.brightness);
        normalizer.mode = config.normalization;
        let mut memory = MemoryBlender::with_decay(config.memory_decay)?;
        memory.mode = config.memory_mode;
        Ok(Scene {
            terrain,
            viewer,
            solver: config.solver,
            lights: LightSet::with_distance_offset(config.distance_offset)?,
            normalizer,
            memory,
            visibility: None,
            light: None,
        })
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn viewer(&self) -> (usize, usize) {
        self.viewer
    }

    pub fn solver(&self) -> &ShadowCaster {
        &self.solver
    }

    pub fn lights(&self) -> &LightSet {
        &self.lights
    }

    pub fn normalization(&self) -> NormalizationMode {
        self.normalizer.mode
    }

    pub fn memory_mode(&self) -> MemoryMode {
        self.memory.mode
    }

    /// The memory image, once at least one frame has been produced.
    pub fn memory(&self) -> Option<&Grid> {
        self.memory.memory()
    }

    /// Move the viewer to any cell of the map, walkable or not.
    pub fn set_viewer(&mut self, viewer: (usize, usize)) -> Result<(), LightingError> {
        check_in_map(&self.terrain, viewer)?;
        if viewer != self.viewer {
            self.viewer = viewer;
            self.visibility = None;
            self.light = None;
        }
        Ok(())
    }

    /// Step by `(dx, dy)` if the destination is walkable. Returns whether the viewer moved.
    pub fn try_step(&mut self, dx: i64, dy: i64) -> bool {
        let x = self.viewer.0 as i64 + dx;
        let y = self.viewer.1 as i64 + dy;
        if !self.terrain.shape().contains(x, y) {
            return false;
        }
        let target = (x as usize, y as usize);
        if !self.terrain.is_walkable(target.0, target.1) {
            return false;
        }
        self.set_viewer(target).is_ok()
    }

    /// Replace one block. Every derived grid that could see the change is dropped.
    pub fn set_block(&mut self, x: usize, y: usize, block: BlockId) -> Result<(), LightingError> {
        self.terrain.set_block(x, y, block)?;
        self.visibility = None;
        self.light = None;
        self.lights.invalidate_shadows();
        Ok(())
    }

    pub fn add_light(&mut self, light: LightSource) -> LightId {
        self.light = None;
        self.lights.add(light)
    }

    pub fn remove_light(&mut self, id: LightId) -> Option<LightSource> {
        self.light = None;
        self.lights.remove(id)
    }

    /// Mutable access to one light; the normalized light is recomputed on the next frame.
    pub fn light_mut(&mut self, id: LightId) -> Option<&mut LightSource> {
        self.light = None;
        self.lights.get_mut(id)
    }

    pub fn set_normalization(&mut self, mode: NormalizationMode) {
        if mode != self.normalizer.mode {
            self.normalizer.set_mode(mode);
            self.light = None;
        }
    }

    pub fn set_memory_mode(&mut self, mode: MemoryMode) {
        self.memory.set_mode(mode);
    }

    /// The viewer's line of sight.
    pub fn visibility(&mut self) -> Result<SharedGrid, LightingError> {
        if let Some(visibility) = &self.visibility {
            return Ok(visibility.clone());
        }
        let visibility = SharedGrid::new(self.solver.solve(self.terrain.opacity(), self.viewer)?);
        log::debug!("viewer at {:?}: visibility {:?}", self.viewer, visibility.id());
        self.visibility = Some(visibility.clone());
        Ok(visibility)
    }

    /// Combined light of every lit source, normalized into [0, 1].
    pub fn normalized_light(&mut self) -> Result<&Grid, LightingError> {
        let light = match self.light.take() {
            Some(light) => light,
            None => self.compute_light()?,
        };
        Ok(&*self.light.insert(light))
    }

    fn compute_light(&mut self) -> Result<Grid, LightingError> {
        let visibility = self.visibility()?;
        let position = (self.viewer.0 as f32, self.viewer.1 as f32);
        for (_, light) in self.lights.iter_mut().filter(|(_, l)| l.is_carried()) {
            light.set_position(position);
            light.set_shadow_mask(visibility.clone());
        }
        let raw = self.lights.combined(self.terrain.opacity(), &self.solver)?;
        Ok(self.normalizer.normalize(&raw))
    }

    /// Produce the next frame and advance the memory by one step.
    pub fn frame(&mut self) -> Result<Frame, LightingError> {
        let visibility = self.visibility()?;
        let light = self.normalized_light()?.clone();
        let sight = light.scale_by_plane(&visibility)?;
        let blended = self.memory.update(&sight, &visibility)?;
        Ok(Frame {
            visibility,
            light,
            sight,
            blended,
        })
    }
}

fn check_in_map(terrain: &Terrain, (x, y): (usize, usize)) -> Result<(), LightingError> {
    let shape = terrain.shape();
    if x >= shape.width || y >= shape.height {
        return Err(LightingError::out_of_bounds(x as i64, y as i64, shape));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::terrain::BlockTypes;

    const ROOM: &str = "\
#######
#.....#
#.###.#
#.....#
#######
";

    fn scene() -> Scene {
        let terrain = Terrain::from_ascii(ROOM, BlockTypes::default()).unwrap();
        Scene::new(terrain, (1, 1), SceneConfig::default()).unwrap()
    }

    #[test]
    fn viewer_must_start_inside_the_map() {
        let terrain = Terrain::from_ascii(ROOM, BlockTypes::default()).unwrap();
        assert!(Scene::new(terrain, (7, 0), SceneConfig::default()).is_err());
    }

    #[test]
    fn unusable_config_is_rejected() {
        let attempt = |config: SceneConfig| {
            let terrain = Terrain::from_ascii(ROOM, BlockTypes::default()).unwrap();
            Scene::new(terrain, (1, 1), config)
        };
        let zero_offset = SceneConfig {
            distance_offset: 0.0,
            ..SceneConfig::default()
        };
        assert!(attempt(zero_offset).is_err());
        let growing_memory = SceneConfig {
            memory_decay: 1.5,
            ..SceneConfig::default()
        };
        assert!(attempt(growing_memory).is_err());

        // Solver fields are checked when a frame is solved.
        let no_slots = SceneConfig::with_solver(ShadowCaster::with_resolution(0, 8));
        let mut scene = attempt(no_slots).unwrap();
        assert!(scene.frame().is_err());
    }

    #[test]
    fn steps_only_onto_walkable_cells() {
        let mut scene = scene();
        assert!(!scene.try_step(-1, 0), "wall");
        assert!(!scene.try_step(0, -1), "wall");
        assert!(scene.try_step(1, 0));
        assert_eq!(scene.viewer(), (2, 1));
        assert!(!scene.try_step(0, 1), "inner wall");
        assert_eq!(scene.viewer(), (2, 1));
    }

    #[test]
    fn visibility_is_reused_until_the_viewer_moves() {
        let mut scene = scene();
        let first = scene.visibility().unwrap().id();
        assert_eq!(scene.visibility().unwrap().id(), first);
        scene.set_viewer((1, 1)).unwrap();
        assert_eq!(scene.visibility().unwrap().id(), first);
        scene.try_step(1, 0);
        assert_ne!(scene.visibility().unwrap().id(), first);
    }

    #[test]
    fn carried_light_shares_the_viewers_line_of_sight() {
        let mut scene = scene();
        let torch = scene.add_light(LightSource::carried(Rgb::new(100.0, 50.0, 10.0)));
        scene.try_step(1, 0);
        let frame = scene.frame().unwrap();
        let light = scene.lights().get(torch).unwrap();
        assert_eq!(light.position(), (2.0, 1.0));
        assert_eq!(light.shadow_mask().map(SharedGrid::id), Some(frame.visibility.id()));
        // The brightest cell is the viewer's own.
        assert_eq!(frame.light.get(2, 1, 0), 1.0);
    }

    #[test]
    fn editing_terrain_invalidates_everything() {
        let mut scene = scene();
        let torch = scene.add_light(LightSource::new((5.0, 1.0), Rgb::new(10.0, 10.0, 10.0)));
        let before = scene.frame().unwrap();
        assert_eq!(before.visibility.get(5, 1, 0), 1.0);
        let shadow = scene.lights().get(torch).unwrap().shadow_mask().unwrap().id();

        let wall = scene.terrain().block_types().id_of("wall").unwrap();
        scene.set_block(3, 1, wall).unwrap();
        let after = scene.frame().unwrap();
        assert_ne!(after.visibility.id(), before.visibility.id());
        assert_eq!(after.visibility.get(5, 1, 0), 0.0);
        assert_ne!(scene.lights().get(torch).unwrap().shadow_mask().unwrap().id(), shadow);
    }

    #[test]
    fn dark_scene_is_all_zero() {
        let mut scene = scene();
        let frame = scene.frame().unwrap();
        assert!(frame.light.data().iter().all(|&v| v == 0.0));
        assert!(frame.blended.data().iter().all(|&v| v == 0.0));
    }
}

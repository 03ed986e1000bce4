//! Interactive scene viewer - keyboard moves the viewer through the map

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::light::LightId;
use crate::memory::MemoryMode;
use crate::normalize::NormalizationMode;
use crate::render::pack_rgb;
use crate::scene::Scene;

/// Configuration for the interactive viewer
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Pixel scale factor (each cell = scale x scale pixels)
    pub scale: usize,
    pub target_fps: usize,
    /// Opacity at which a cell is outlined as a wall
    pub wall_threshold: f32,
    /// Start with wall outlines shown
    pub show_walls: bool,
    /// Decay of the running maximum selected with `2`
    pub running_max_decay: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            scale: 16,
            target_fps: 60,
            wall_threshold: 0.5,
            show_walls: false,
            running_max_decay: 0.98,
        }
    }
}

/// Window showing the blended output of a [`Scene`]
pub struct InteractiveViewer {
    config: ViewerConfig,
    scene: Scene,
    carried: Option<LightId>,
    window: Window,
}

impl InteractiveViewer {
    /// Open a window sized to the scene. `carried` is the light toggled with `L`.
    pub fn new(
        scene: Scene,
        carried: Option<LightId>,
        config: ViewerConfig,
    ) -> Result<Self, String> {
        let terrain = scene.terrain();
        let window_w = terrain.width() * config.scale;
        let window_h = terrain.height() * config.scale;

        let window = Window::new(
            "torchsight - arrows/WASD to move (ESC to exit)",
            window_w,
            window_h,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| e.to_string())?;

        Ok(Self {
            config,
            scene,
            carried,
            window,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Run the viewer loop until the window closes or ESC is pressed
    pub fn run(&mut self) -> Result<(), String> {
        let scale = self.config.scale;
        let (window_w, window_h) = (
            self.scene.terrain().width() * scale,
            self.scene.terrain().height() * scale,
        );
        self.window.set_target_fps(self.config.target_fps);
        let mut show_walls = self.config.show_walls;

        println!("=== Interactive Scene Viewer ===");
        println!("Controls:");
        println!("  Arrows/WASD - Move");
        println!("  L           - Light/extinguish carried torch");
        println!("  1/2         - Normalization: frame max/running max");
        println!("  M           - Memory: per channel/tinted");
        println!("  T           - Toggle wall outlines");
        println!("  ESC         - Exit");
        println!();

        while self.window.is_open() && !self.window.is_key_down(Key::Escape) {
            self.handle_movement();

            if self.window.is_key_pressed(Key::L, KeyRepeat::No) {
                if let Some(light) = self.carried.and_then(|id| self.scene.light_mut(id)) {
                    let lit = !light.is_lit();
                    light.set_lit(lit);
                    println!("Carried torch: {}", if lit { "lit" } else { "out" });
                }
            }
            if self.window.is_key_pressed(Key::Key1, KeyRepeat::No) {
                self.scene.set_normalization(NormalizationMode::FrameMax);
                println!("Normalization: frame max");
            }
            if self.window.is_key_pressed(Key::Key2, KeyRepeat::No) {
                self.scene.set_normalization(NormalizationMode::RunningMax {
                    decay: self.config.running_max_decay,
                });
                println!("Normalization: running max");
            }
            if self.window.is_key_pressed(Key::M, KeyRepeat::No) {
                let mode = match self.scene.memory_mode() {
                    MemoryMode::PerChannel => MemoryMode::Tinted { channel: 2 },
                    MemoryMode::Tinted { .. } => MemoryMode::PerChannel,
                };
                self.scene.set_memory_mode(mode);
                println!("Memory: {:?}", mode);
            }
            if self.window.is_key_pressed(Key::T, KeyRepeat::No) {
                show_walls = !show_walls;
            }

            let frame = self.scene.frame().map_err(|e| e.to_string())?;
            let opacity = self.scene.terrain().opacity();
            let walls = show_walls.then_some((&**opacity, self.config.wall_threshold));
            let buffer = pack_rgb(&frame.blended, walls, scale);

            self.window
                .update_with_buffer(&buffer, window_w, window_h)
                .map_err(|e| e.to_string())?;
        }

        Ok(())
    }

    fn handle_movement(&mut self) {
        const MOVES: [(Key, Key, i64, i64); 4] = [
            (Key::Left, Key::A, -1, 0),
            (Key::Right, Key::D, 1, 0),
            (Key::Up, Key::W, 0, -1),
            (Key::Down, Key::S, 0, 1),
        ];
        for (arrow, letter, dx, dy) in MOVES {
            if self.window.is_key_pressed(arrow, KeyRepeat::Yes)
                || self.window.is_key_pressed(letter, KeyRepeat::Yes)
            {
                if self.scene.try_step(dx, dy) {
                    log::debug!("viewer moved to {:?}", self.scene.viewer());
                }
            }
        }
    }
}

//! A small dungeon to look at.

use crate::color::Rgb;
use crate::error::LightingError;
use crate::light::{LightId, LightSource};
use crate::scene::{Scene, SceneConfig};
use crate::terrain::{BlockTypes, Terrain};

pub const DEMO_MAP: &str = "\
########################################
#..........#...........#...............#
#..........#...........#...............#
#..........#.....#.....#.....#####.....#
#..........#.....#.....#.....#   #.....#
#................#...........#   #.....#
#..........#.....#.....#.....#####.....#
#..........#.....#.....#...............#
#####.######.....#######.......#.......#
#...........................#..#.......#
#...........................#..#.......#
#####.######..#..#..#..#######.#########
#..........#...................#.......#
#..........#...................#.......#
#..........#######.#####.......#.......#
#......................#...............#
#..........#...........#.......#.......#
########################################
";

/// Where the viewer starts.
pub const DEMO_START: (usize, usize) = (3, 9);

/// Color of the torch the viewer carries.
pub const CARRIED_TORCH: Rgb = Rgb::new(10000.0, 5000.0, 1000.0);

/// Wall torches: position and color.
pub const DEMO_TORCHES: [((f32, f32), Rgb); 6] = [
    ((14.0, 2.0), Rgb::new(10000.0, 5000.0, 1000.0)),
    ((35.0, 2.0), Rgb::new(2000.0, 1200.0, 400.0)),
    ((35.0, 13.0), Rgb::new(2000.0, 1200.0, 400.0)),
    ((5.0, 13.0), Rgb::new(400.0, 1200.0, 2000.0)),
    ((26.0, 15.0), Rgb::new(2000.0, 1200.0, 400.0)),
    ((20.0, 9.0), Rgb::new(1500.0, 300.0, 300.0)),
];

pub fn demo_terrain() -> Result<Terrain, LightingError> {
    Terrain::from_ascii(DEMO_MAP, BlockTypes::default())
}

/// The demo level with its wall torches, plus the id of the carried torch.
pub fn demo_scene(config: SceneConfig) -> Result<(Scene, LightId), LightingError> {
    let mut scene = Scene::new(demo_terrain()?, DEMO_START, config)?;
    for (position, color) in DEMO_TORCHES {
        scene.add_light(LightSource::new(position, color));
    }
    let carried = scene.add_light(LightSource::carried(CARRIED_TORCH));
    Ok((scene, carried))
}

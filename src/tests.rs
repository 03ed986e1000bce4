//! Scenario tests for the whole pipeline

use pretty_assertions::assert_eq;

use crate::demo::{DEMO_START, demo_scene, demo_terrain};
use crate::{
    BlockTypes, Grid, LightSource, NormalizationMode, Rgb, Scene, SceneConfig, ShadowCaster,
    SumStats, Terrain, VisibilityAlgorithm, save_ppm, visibility_to_string,
};

const TWO_ROOMS: &str = "\
#########
#...#...#
#...#...#
#.......#
#########
";

fn two_rooms(viewer: (usize, usize)) -> Scene {
    let terrain = Terrain::from_ascii(TWO_ROOMS, BlockTypes::default()).unwrap();
    Scene::new(terrain, viewer, SceneConfig::default()).unwrap()
}

#[test]
fn test_single_wall_example() {
    // Nested [x][y] input, as a caller holding column-major data would pass it.
    let mut columns = vec![vec![0.0f32; 5]; 5];
    columns[2][3] = 1.0;
    let opacity = Grid::from_columns(&columns).unwrap();

    let visibility = ShadowCaster::new().solve(&opacity, (2, 2)).unwrap();
    println!("{}", visibility_to_string(&visibility));
    assert_eq!(visibility.get(2, 4, 0), 0.0);
    assert_eq!(visibility.get(2, 1, 0), 1.0);
    assert_eq!(visibility.get(3, 2, 0), 1.0);
}

#[test]
fn test_memory_fades_while_hidden_and_refreshes_when_seen() {
    let mut scene = two_rooms((5, 3));
    scene.add_light(LightSource::carried(Rgb::new(1000.0, 800.0, 600.0)));
    scene.add_light(LightSource::new((6.0, 1.0), Rgb::new(500.0, 500.0, 500.0)));

    let walk = [
        (0, 0),
        (-1, 0),
        (-1, 0),
        (-1, 0),
        (-1, 0),
        (0, -1),
        (0, -1),
        (0, 0),
        (0, 0),
        (1, 0),
    ];
    let mut previous: Option<Grid> = None;
    for (dx, dy) in walk {
        scene.try_step(dx, dy);
        let frame = scene.frame().unwrap();
        let memory = scene.memory().unwrap().clone();
        let channels = memory.channels();

        for (i, (&m, &s)) in memory.data().iter().zip(frame.sight.data()).enumerate() {
            assert!(m >= s, "memory below live sight at value {i}");
            let visible = frame.visibility.data()[i / channels];
            if visible == 0.0 {
                if let Some(prev) = &previous {
                    assert!(m <= prev.data()[i], "hidden memory brightened at value {i}");
                }
                assert_eq!(frame.blended.data()[i], m);
            }
        }
        previous = Some(memory);
    }

    // The far room was seen at the start and is remembered from (1, 1).
    assert_eq!(scene.viewer(), (2, 1));
    let memory = scene.memory().unwrap();
    assert!(memory.get(6, 1, 0) > 0.0);
}

#[test]
fn test_unlit_lights_change_nothing() {
    let mut with_unlit = two_rooms((1, 1));
    with_unlit.add_light(LightSource::new((2.0, 2.0), Rgb::new(100.0, 100.0, 100.0)));
    let unlit = with_unlit.add_light(LightSource::new((6.0, 2.0), Rgb::new(0.0, 0.0, 900.0)));
    with_unlit.light_mut(unlit).unwrap().set_lit(false);

    let mut alone = two_rooms((1, 1));
    alone.add_light(LightSource::new((2.0, 2.0), Rgb::new(100.0, 100.0, 100.0)));

    assert_eq!(with_unlit.frame().unwrap().light, alone.frame().unwrap().light);
}

#[test]
fn test_darkness_never_produces_nan() {
    let mut scene = two_rooms((1, 1));
    let torch = scene.add_light(LightSource::new((2.0, 2.0), Rgb::new(100.0, 100.0, 100.0)));
    scene.light_mut(torch).unwrap().set_lit(false);
    for mode in [NormalizationMode::FrameMax, NormalizationMode::RunningMax { decay: 0.9 }] {
        scene.set_normalization(mode);
        let frame = scene.frame().unwrap();
        assert!(frame.light.data().iter().all(|&v| v == 0.0));
        assert!(frame.blended.data().iter().all(|v| v.is_finite()));
    }
}

#[test]
fn test_brightest_cell_is_one() {
    let mut scene = two_rooms((1, 1));
    scene.add_light(LightSource::new((2.0, 2.0), Rgb::new(100.0, 50.0, 10.0)));
    let frame = scene.frame().unwrap();
    assert_eq!(frame.light.max_value(), 1.0);
    assert_eq!(frame.light.get(2, 2, 0), 1.0);
}

#[test]
fn test_carried_torch_lights_only_what_the_viewer_sees() {
    let mut scene = two_rooms((1, 1));
    let torch = scene.add_light(LightSource::carried(Rgb::new(100.0, 100.0, 100.0)));
    let frame = scene.frame().unwrap();
    let contribution = scene.lights().get(torch).unwrap().contribution().unwrap();
    for y in 0..frame.visibility.height() {
        for x in 0..frame.visibility.width() {
            if frame.visibility.get(x, y, 0) == 0.0 {
                let lit = contribution.cell(x, y);
                assert_eq!(lit, &[0.0, 0.0, 0.0], "lit hidden cell ({x}, {y})");
            }
        }
    }
    assert_eq!(frame.visibility.get(6, 1, 0), 0.0);
}

#[test]
fn test_walking_reuses_static_torches() {
    let (mut scene, _) = demo_scene(SceneConfig::default()).unwrap();
    let torches = scene.lights().len() - 1;

    for step in 0..3 {
        let dx = if step % 2 == 0 { 1 } else { -1 };
        assert!(scene.try_step(dx, 0));
        scene.frame().unwrap();
    }
    // Only the carried torch changes from step to step.
    assert_eq!(
        scene.lights().cache_stats(),
        Some(SumStats {
            used_from_cache: torches,
            stored_in_cache: torches,
            summed: 1
        })
    );
}

#[test]
fn test_demo_level_solves_from_every_floor_cell() {
    let terrain = demo_terrain().unwrap();
    let solver = ShadowCaster::new();
    for y in 0..terrain.height() {
        for x in 0..terrain.width() {
            if terrain.is_walkable(x, y) {
                let visibility = solver.solve(terrain.opacity(), (x, y));
                assert!(visibility.is_ok(), "solve failed at ({x}, {y}): {visibility:?}");
            }
        }
    }
}

#[test]
fn test_snapshot_file() {
    let (mut scene, _) = demo_scene(SceneConfig::default()).unwrap();
    assert_eq!(scene.viewer(), DEMO_START);
    let frame = scene.frame().unwrap();

    let name = format!("torchsight-snapshot-{}.ppm", std::process::id());
    let path = std::env::temp_dir().join(name);
    save_ppm(&frame.blended, &path, 2).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("P3"));
    assert_eq!(lines.next(), Some("80 36"));
    assert_eq!(lines.next(), Some("255"));
    assert_eq!(lines.count(), 36);
}

#[test]
fn test_small_distance_offset_keeps_the_room_lit() {
    let terrain = Terrain::from_ascii("...\n...\n", BlockTypes::default()).unwrap();
    let config = SceneConfig {
        distance_offset: 0.01,
        ..SceneConfig::default()
    };
    let mut scene = Scene::new(terrain.clone(), (0, 0), config).unwrap();
    scene.add_light(LightSource::new((2.0, 1.0), Rgb::new(1.0, 1.0, 1.0)));
    let frame = scene.frame().unwrap();
    assert!(frame.light.data().iter().all(|v| v.is_finite()));
    assert_eq!(frame.light.get(2, 1, 0), 1.0);

    let zero = SceneConfig {
        distance_offset: 0.0,
        ..SceneConfig::default()
    };
    assert!(Scene::new(terrain, (0, 0), zero).is_err());
}

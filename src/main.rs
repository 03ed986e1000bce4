use std::time::Instant;

use torchsight::demo::demo_scene;
use torchsight::{
    Grid, GridSumCache, InteractiveViewer, SceneConfig, ShadowCaster, Shape, SharedGrid,
    VisibilityAlgorithm, ViewerConfig, save_ppm,
};

fn main() {
    env_logger::init();

    // Check for command line arguments
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("--interactive") => run_interactive(),
        Some("--benchmark") => run_benchmark(),
        Some("--snapshot") => match args.get(2) {
            Some(path) => run_snapshot(path),
            None => eprintln!("Usage: --snapshot <file.ppm>"),
        },
        _ => {
            println!("torchsight");
            println!("Run with --interactive for minifb viewer");
            println!("Run with --benchmark to test performance");
            println!("Run with --snapshot <file.ppm> to render the demo level");
        }
    }
}

/// Open floor with a regular field of pillars.
fn pillar_field(width: usize, height: usize) -> Grid {
    let mut opacity = Grid::zeros(Shape::new(width, height, 1));
    for y in (2..height).step_by(5) {
        for x in (2..width).step_by(5) {
            opacity.set(x, y, 0, 1.0);
        }
    }
    opacity
}

fn run_benchmark() {
    println!("=== Shadow Casting Benchmark ===\n");

    let sizes = [(50, 50), (100, 100), (200, 200)];
    let iterations = 20;
    let solver = ShadowCaster::new();

    for (width, height) in sizes {
        println!("Grid size: {}x{}", width, height);
        println!("-----------------------");

        let opacity = pillar_field(width, height);
        let viewer = (width / 2 + 1, height / 2 + 1);

        let start = Instant::now();
        for _ in 0..iterations {
            if let Err(e) = solver.solve(&opacity, viewer) {
                eprintln!("  Solve failed: {}", e);
                break;
            }
        }
        let avg_ms = start.elapsed().as_secs_f64() * 1000.0 / iterations as f64;
        println!("  Visibility: {:.3} ms/iter", avg_ms);
        println!();
    }

    println!("=== Sum Cache Benchmark ===");
    println!("(32 light grids, 1 replaced per frame)\n");

    let shape = Shape::new(100, 100, 3);
    let mut grids: Vec<SharedGrid> = (0..32)
        .map(|i| SharedGrid::new(Grid::filled(shape, i as f32)))
        .collect();

    // Everything summed from scratch each frame
    let start = Instant::now();
    for i in 0..iterations {
        grids[0] = SharedGrid::new(Grid::filled(shape, i as f32));
        let _ = GridSumCache::new().sum(&grids);
    }
    let avg_cold_ms = start.elapsed().as_secs_f64() * 1000.0 / iterations as f64;

    // One cache kept across frames
    let mut cache = GridSumCache::new();
    let start = Instant::now();
    for i in 0..iterations {
        grids[0] = SharedGrid::new(Grid::filled(shape, i as f32));
        let _ = cache.sum(&grids);
    }
    let avg_warm_ms = start.elapsed().as_secs_f64() * 1000.0 / iterations as f64;

    println!("  Without cache: {:.3} ms/iter", avg_cold_ms);
    println!("  With cache:    {:.3} ms/iter", avg_warm_ms);
    println!("  Speedup: {:.2}x", avg_cold_ms / avg_warm_ms);
    if let Some(stats) = cache.last_stats() {
        println!("  Last frame: {:?}", stats);
    }
    println!();

    println!("=== Demo Scene Frame ===\n");
    match demo_scene(SceneConfig::default()) {
        Ok((mut scene, _)) => {
            let start = Instant::now();
            let mut frames = 0;
            for step in 0..iterations {
                let dx = if step % 2 == 0 { 1 } else { -1 };
                scene.try_step(dx, 0);
                if let Err(e) = scene.frame() {
                    eprintln!("  Frame failed: {}", e);
                    break;
                }
                frames += 1;
            }
            let avg_ms = start.elapsed().as_secs_f64() * 1000.0 / frames.max(1) as f64;
            println!("  Moving viewer: {:.3} ms/frame", avg_ms);
            println!("  Estimated max FPS: {:.1}", 1000.0 / avg_ms);
        }
        Err(e) => eprintln!("  Failed to build demo scene: {}", e),
    }
}

fn run_snapshot(path: &str) {
    let frame = demo_scene(SceneConfig::default()).and_then(|(mut scene, _)| scene.frame());
    match frame {
        Ok(frame) => match save_ppm(&frame.blended, path, 8) {
            Ok(()) => println!("Saved {}", path),
            Err(e) => eprintln!("Failed to write {}: {}", path, e),
        },
        Err(e) => eprintln!("Failed to render demo scene: {}", e),
    }
}

fn run_interactive() {
    let (scene, carried) = match demo_scene(SceneConfig::default()) {
        Ok(demo) => demo,
        Err(e) => {
            eprintln!("Failed to build demo scene: {}", e);
            return;
        }
    };

    match InteractiveViewer::new(scene, Some(carried), ViewerConfig::default()) {
        Ok(mut viewer) => {
            if let Err(e) = viewer.run() {
                eprintln!("Error: {}", e);
            }
        }
        Err(e) => {
            eprintln!("Failed to create viewer: {}", e);
        }
    }
}

//! # Engine Tests
//!
//! End-to-end runs through the facade: config, generation, ticks, edits,
//! rendering.

use std::ops::ControlFlow;

use sandfall::core::{Brush, Color, Material, PixelSink, PoolState, TextureKind};
use sandfall::{Command, Engine, EngineConfig, EngineError, FrameBuffer, ProceduralTextures};

fn small_config(threads: usize) -> EngineConfig {
    let mut config = EngineConfig {
        threads,
        bands: 6,
        ..EngineConfig::default()
    };
    config.terrain.seed = 42;
    config.terrain.width = 96;
    config.terrain.height = 72;
    config.terrain.noise_scale = 0.04;
    config.terrain.water_density = 120;
    config.terrain.lava_density = 60;
    config
}

/// Test: Same seed and band count give the same world for any thread count.
#[test]
fn test_threads_do_not_change_result() {
    let mut inline = Engine::init(small_config(0)).unwrap_or_else(|e| panic!("{e}"));
    let mut pooled = Engine::init(small_config(3)).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(inline.grid().checksum(), pooled.grid().checksum());

    for _ in 0..50 {
        let a = inline.step();
        let b = pooled.step();
        assert_eq!(a.fluids, b.fluids, "tick {}", a.tick);
    }
    assert_eq!(inline.grid(), pooled.grid());
    assert_eq!(inline.grid().count_fluid(), pooled.grid().count_fluid());
}

/// Test: Fluids never multiply and the fluid index tracks the grid.
#[test]
fn test_fluid_count_never_grows() {
    let mut engine = Engine::init(small_config(2)).unwrap_or_else(|e| panic!("{e}"));
    let mut fluids = engine.grid().count_fluid();
    assert!(fluids > 0);

    for _ in 0..80 {
        engine.step();
        let now = engine.grid().count_fluid();
        assert!(now <= fluids);
        fluids = now;
    }

    let live: Vec<usize> = engine.fluids().iter().collect();
    for index in live {
        let cell = engine.grid().cell(index);
        assert_eq!(cell.map(|c| c.material), Some(Material::Fluid));
    }
}

/// Test: Regenerate swaps the world and keeps ticking.
#[test]
fn test_regenerate_between_ticks() {
    let mut engine = Engine::init(small_config(2)).unwrap_or_else(|e| panic!("{e}"));
    let before = engine.grid().checksum();
    engine.step();

    assert!(engine.apply(Command::Regenerate { seed: 7 }).is_continue());
    assert_ne!(engine.grid().checksum(), before);
    assert_eq!(engine.grid().seed(), 7);
    assert_eq!(engine.config().terrain.seed, 7);

    let fresh = Engine::init(EngineConfig {
        terrain: sandfall::procedural::TerrainConfig {
            seed: 7,
            ..small_config(0).terrain
        },
        ..small_config(0)
    })
    .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(engine.grid(), fresh.grid());

    let stats = engine.step();
    assert_eq!(stats.tick, 2);
}

/// Test: Pouring water registers every new fluid cell.
#[test]
fn test_pour_water() {
    let mut config = small_config(2);
    config.terrain.water_density = 0;
    config.terrain.lava_density = 0;
    let mut engine = Engine::init(config).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(engine.grid().count_fluid(), 0);

    // Clear an area first so the pour is not blocked by rock.
    engine.alter(&Brush::erase(48, 20).allow_indestructible(true));
    assert!(engine.apply(Command::PourWater { x: 48, y: 20 }).is_continue());

    let poured = engine.grid().count_kind(TextureKind::Water);
    assert!(poured > 0);
    let stats = engine.step();
    assert_eq!(stats.fluids.visited, poured as u64);
}

/// Test: A dropped in-flight tick is synced before the engine is reused.
#[test]
fn test_dropped_tick_is_synced() {
    let mut engine = Engine::init(small_config(3)).unwrap_or_else(|e| panic!("{e}"));
    {
        let tick = engine.begin_tick();
        assert_eq!(tick.tick(), 1);
    }
    assert_eq!(engine.tick_count(), 1);
    assert_eq!(engine.simulation().pool().state(), PoolState::AllIdle);
    assert_eq!(engine.simulation().pool().outstanding(), 0);
}

/// Test: Rendering draws every non-air cell and skips air.
#[test]
fn test_render_matches_grid() {
    let engine = Engine::init(small_config(1)).unwrap_or_else(|e| panic!("{e}"));
    let background = Color::rgb(1, 2, 3);
    let mut frame = FrameBuffer::new(96, 72, background);
    engine.render(&mut frame);

    for (index, cell) in engine.grid().cells().iter().enumerate() {
        let (x, y) = engine.grid().coords(index);
        let expected = if cell.color.is_transparent() {
            background
        } else {
            cell.color
        };
        assert_eq!(frame.pixel(x, y), Some(expected));
    }
}

/// Test: A custom sampler colors the world.
#[test]
fn test_custom_sampler() {
    let sampler = std::sync::Arc::new(|kind: TextureKind, _x: i32, _y: i32| match kind {
        TextureKind::Air => Color::TRANSPARENT,
        _ => Color::rgb(0xAB, 0xCD, 0xEF),
    });
    let engine = Engine::with_sampler(small_config(0), sampler).unwrap_or_else(|e| panic!("{e}"));

    let painted = engine
        .grid()
        .cells()
        .iter()
        .filter(|cell| !cell.is_void())
        .all(|cell| cell.color == Color::rgb(0xAB, 0xCD, 0xEF));
    assert!(painted);
}

/// Test: Bad configs surface as typed errors.
#[test]
fn test_invalid_config() {
    let mut config = small_config(1);
    config.terrain.width = 0;
    assert!(matches!(Engine::init(config), Err(EngineError::Config(_))));

    let config = EngineConfig {
        tickrate: 0,
        ..small_config(1)
    };
    assert!(matches!(Engine::init(config), Err(EngineError::Setting { .. })));
}

/// Test: Shutdown is safe to call and later ticks still run.
#[test]
fn test_shutdown_then_step() {
    let mut engine = Engine::init(small_config(2)).unwrap_or_else(|e| panic!("{e}"));
    engine.shutdown();
    engine.shutdown();
    let stats = engine.step();
    assert_eq!(stats.tick, 1);
    assert_eq!(engine.apply(Command::Quit), ControlFlow::Break(()));
}

/// Test: The built-in textures plug into any pixel sink.
#[test]
fn test_procedural_textures_render() {
    struct Counter(usize);
    impl PixelSink for Counter {
        fn draw_pixel(&mut self, _x: i32, _y: i32, _argb: Color) {
            self.0 += 1;
        }
    }

    let textures = std::sync::Arc::new(ProceduralTextures::new(3));
    let engine = Engine::with_sampler(small_config(0), textures).unwrap_or_else(|e| panic!("{e}"));
    let mut counter = Counter(0);
    engine.render(&mut counter);

    let opaque = engine.grid().cells().iter().filter(|c| !c.is_void()).count();
    assert_eq!(counter.0, opaque);
}

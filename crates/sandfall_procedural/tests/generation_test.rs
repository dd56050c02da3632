//! # Generation Tests
//!
//! Whole-world properties of the terrain generator.

use sandfall_core::{Color, Material, TextureKind};
use sandfall_procedural::{generate, ConfigError, Stencil, TerrainConfig, TerrainGenerator};

fn sampler(kind: TextureKind, x: i32, y: i32) -> Color {
    match kind {
        TextureKind::Air => Color::TRANSPARENT,
        other => Color::rgb(other as u8, (x & 0xFF) as u8, (y & 0xFF) as u8),
    }
}

fn config(seed: u32) -> TerrainConfig {
    TerrainConfig {
        seed,
        width: 64,
        height: 64,
        noise_scale: 0.04,
        ..TerrainConfig::default()
    }
}

/// Test: Same seed twice gives the same grid, cell for cell.
#[test]
fn test_same_seed_same_world() {
    let first = generate(&config(42), &sampler).unwrap_or_else(|e| panic!("{e}"));
    let second = generate(&config(42), &sampler).unwrap_or_else(|e| panic!("{e}"));

    assert_eq!(first.grid, second.grid);
    assert_eq!(first.grid.checksum(), second.grid.checksum());
    assert_eq!(first.fluids, second.fluids);
}

/// Test: Regenerating with another seed changes the terrain.
#[test]
fn test_regenerate_changes_world() {
    let mut generator = TerrainGenerator::new(config(42)).unwrap_or_else(|e| panic!("{e}"));
    let before = generator.generate(&sampler);
    let after = generator.regenerate(43, &sampler);

    assert_ne!(before.grid.checksum(), after.grid.checksum());
    assert_eq!(generator.config().seed, 43);

    let back = generator.regenerate(42, &sampler);
    assert_eq!(back.grid, before.grid);
}

/// Test: Invalid configs are rejected before anything is allocated.
#[test]
fn test_invalid_config() {
    let zero = TerrainConfig {
        height: 0,
        ..config(1)
    };
    assert_eq!(
        TerrainGenerator::new(zero).err(),
        Some(ConfigError::NonPositiveDimension {
            width: 64,
            height: 0
        })
    );

    let flat = TerrainConfig {
        noise_scale: 0.0,
        ..config(1)
    };
    assert!(matches!(
        generate(&flat, &sampler),
        Err(ConfigError::InvalidNoiseScale(_))
    ));
}

/// Test: Every generated fluid cell is in the fluid set and nothing else is.
#[test]
fn test_fluids_registered() {
    let wet = TerrainConfig {
        water_density: 200,
        lava_density: 200,
        ..config(9)
    };
    let world = generate(&wet, &sampler).unwrap_or_else(|e| panic!("{e}"));

    let fluid_cells = world.grid.count_fluid();
    assert!(fluid_cells > 0, "no pockets were poured");
    assert_eq!(world.fluids.len(), fluid_cells);
    for index in world.fluids.iter() {
        let cell = world.grid.cell(index).unwrap_or_else(|| panic!("index {index} out of grid"));
        assert!(cell.is_fluid());
    }
}

/// Test: Rocks cannot be erased and keep their terrain noise.
#[test]
fn test_rock_is_indestructible() {
    let rocky = TerrainConfig {
        object_density: 255,
        ..config(21)
    };
    let world = generate(&rocky, &sampler).unwrap_or_else(|e| panic!("{e}"));

    let rocks: Vec<_> = world
        .grid
        .cells()
        .iter()
        .filter(|cell| cell.texture_kind == TextureKind::Rock)
        .collect();
    assert!(!rocks.is_empty());
    assert!(rocks
        .iter()
        .all(|cell| cell.material == Material::SolidIndestructible));
}

/// Test: A custom stencil is what gets stamped.
#[test]
fn test_custom_stencil() {
    let dot = Stencil::from_argb(1, 1, &[0xFF00_0000]).unwrap_or_else(|e| panic!("{e}"));
    let rocky = TerrainConfig {
        object_density: 255,
        water_density: 0,
        lava_density: 0,
        ..config(4)
    };
    let generator = TerrainGenerator::new(rocky)
        .unwrap_or_else(|e| panic!("{e}"))
        .with_stencil(dot);
    let world = generator.generate(&sampler);

    let rocks = world.grid.count_kind(TextureKind::Rock);
    assert!(rocks > 0);
    assert!(rocks <= sandfall_procedural::TRIALS_PER_PASS as usize);
}

/// Test: Air cells are transparent, everything else was colored by the sampler.
#[test]
fn test_colors_come_from_sampler() {
    let world = generate(&config(5), &sampler).unwrap_or_else(|e| panic!("{e}"));

    for (index, cell) in world.grid.cells().iter().enumerate() {
        let (x, y) = world.grid.coords(index);
        assert_eq!(cell.color, sampler(cell.texture_kind, x, y), "cell {index}");
    }
}

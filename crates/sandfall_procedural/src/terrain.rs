//! # Terrain Generator
//!
//! Turns a seed and a [`TerrainConfig`] into a fresh [`World`].
//!
//! ## Passes
//!
//! ```text
//!   1. noise    every cell: noise <= dirt_threshold ? Dirt : Air
//!   2. objects  128 trials, rock stencil stamped as SolidIndestructible
//!   3. fluids   128 trials per fluid (water, then lava), circles r 8..=23,
//!               only where the cached noise is above dirt_threshold
//!   4. moss     128 trials, circles r 3..=8, Dirt -> Moss
//! ```
//!
//! Every random draw comes from one `ChaCha8Rng` seeded from the world
//! seed, so the same seed always yields the same world.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use sandfall_core::{alter, Brush, Cell, MaterialGrid, TextureKind, TextureSampler, World};

use crate::error::{ConfigError, ConfigResult};
use crate::noise::{NoiseField, WorldSeed};
use crate::stencil::Stencil;

/// Largest grid the generator will allocate.
pub const MAX_CELLS: u64 = 1 << 26;

/// Random trials per placement pass.
pub const TRIALS_PER_PASS: u32 = 128;

/// Sub-stream of the world seed feeding the placement passes.
const PLACEMENT_STREAM: u64 = 0x504C_4143_45;

/// Terrain generation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// World seed.
    pub seed: u32,
    /// Width in cells.
    pub width: i32,
    /// Height in cells.
    pub height: i32,
    /// Noise frequency per cell.
    pub noise_scale: f32,
    /// Cells whose noise byte is at or below this become dirt.
    pub dirt_threshold: u8,
    /// Chance (out of 255) per trial to place a rock.
    pub object_density: u8,
    /// Chance (out of 255) per trial to pour a water pocket.
    pub water_density: u8,
    /// Chance (out of 255) per trial to pour a lava pocket.
    pub lava_density: u8,
    /// Chance (out of 255) per trial to grow a moss clump.
    pub moss_density: u8,
    /// Noise octaves; 1 is plain noise.
    pub octaves: u32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            width: 640,
            height: 480,
            noise_scale: 0.005,
            dirt_threshold: 170,
            object_density: 48,
            water_density: 40,
            lava_density: 12,
            moss_density: 0,
            octaves: 1,
        }
    }
}

impl TerrainConfig {
    /// Checks the config before anything is allocated.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(ConfigError::NonPositiveDimension {
                width: self.width,
                height: self.height,
            });
        }
        if !self.noise_scale.is_finite() || self.noise_scale <= 0.0 {
            return Err(ConfigError::InvalidNoiseScale(self.noise_scale));
        }
        let cells = u64::from(self.width.unsigned_abs()) * u64::from(self.height.unsigned_abs());
        if cells > MAX_CELLS {
            return Err(ConfigError::GridTooLarge {
                cells,
                limit: MAX_CELLS,
            });
        }
        Ok(())
    }

    /// Width as an unsigned cell count. Only meaningful after `validate`.
    #[must_use]
    pub fn grid_width(&self) -> u32 {
        u32::try_from(self.width).unwrap_or(0)
    }

    /// Height as an unsigned cell count. Only meaningful after `validate`.
    #[must_use]
    pub fn grid_height(&self) -> u32 {
        u32::try_from(self.height).unwrap_or(0)
    }
}

/// Produces worlds from a config.
#[derive(Debug)]
pub struct TerrainGenerator {
    config: TerrainConfig,
    noise: NoiseField,
    stencil: Stencil,
}

impl TerrainGenerator {
    /// Creates a generator.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid.
    pub fn new(config: TerrainConfig) -> ConfigResult<Self> {
        config.validate()?;
        let noise = NoiseField::new(config.seed);
        Ok(Self {
            config,
            noise,
            stencil: Stencil::default(),
        })
    }

    /// Replaces the rock stencil.
    #[must_use]
    pub fn with_stencil(mut self, stencil: Stencil) -> Self {
        self.stencil = stencil;
        self
    }

    /// The active config.
    #[must_use]
    pub const fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// The noise field.
    #[must_use]
    pub const fn noise(&self) -> &NoiseField {
        &self.noise
    }

    /// Generates a world from the current seed.
    pub fn generate(&self, sampler: &dyn TextureSampler) -> World {
        let config = &self.config;
        let mut world = World::empty(config.grid_width(), config.grid_height(), config.seed);
        let mut rng = ChaCha8Rng::seed_from_u64(
            WorldSeed::from(config.seed).derive(PLACEMENT_STREAM).value(),
        );

        self.noise_pass(&mut world.grid, sampler);
        let rocks = self.object_pass(&mut world.grid, sampler, &mut rng);
        let pockets = self.fluid_pass(&mut world, sampler, &mut rng, TextureKind::Water, config.water_density)
            + self.fluid_pass(&mut world, sampler, &mut rng, TextureKind::Lava, config.lava_density);
        let clumps = self.moss_pass(&mut world.grid, sampler, &mut rng);

        tracing::info!(
            seed = config.seed,
            width = config.width,
            height = config.height,
            rocks,
            pockets,
            clumps,
            fluids = world.fluids.len(),
            "Terrain generated"
        );
        world
    }

    /// Reseeds the noise and generates a new world.
    pub fn regenerate(&mut self, seed: u32, sampler: &dyn TextureSampler) -> World {
        tracing::info!(seed, "Regenerating terrain");
        self.config.seed = seed;
        self.noise.reseed(seed);
        self.generate(sampler)
    }

    fn noise_pass(&self, grid: &mut MaterialGrid, sampler: &dyn TextureSampler) {
        let scale = self.config.noise_scale;
        for y in 0..self.config.height {
            for x in 0..self.config.width {
                let (nx, ny) = (x as f32 * scale, y as f32 * scale);
                let n = if self.config.octaves > 1 {
                    self.noise.octaved(nx, ny, self.config.octaves, 0.5, 2.0)
                } else {
                    self.noise.sample(nx, ny)
                };
                let noise_value = ((n + 1.0) * 0.5 * 255.0) as u8;
                let kind = if noise_value <= self.config.dirt_threshold {
                    TextureKind::Dirt
                } else {
                    TextureKind::Air
                };
                let cell = Cell::of_kind(kind)
                    .with_noise(noise_value)
                    .with_color(sampler.sample_color(kind, x, y));
                grid.set(x, y, cell);
            }
        }
    }

    fn object_pass(
        &self,
        grid: &mut MaterialGrid,
        sampler: &dyn TextureSampler,
        rng: &mut ChaCha8Rng,
    ) -> u32 {
        let mut placed = 0;
        for _ in 0..TRIALS_PER_PASS {
            let (x, y) = random_cell(&self.config, rng);
            if !roll(rng, self.config.object_density) {
                continue;
            }
            for (dx, dy) in self.stencil.solid_offsets() {
                let (gx, gy) = (x + dx, y + dy);
                let Some(old) = grid.get(gx, gy) else {
                    continue;
                };
                let rock = Cell::of_kind(TextureKind::Rock)
                    .with_noise(old.noise_value)
                    .with_color(sampler.sample_color(TextureKind::Rock, gx, gy));
                grid.set(gx, gy, rock);
            }
            placed += 1;
        }
        placed
    }

    fn fluid_pass(
        &self,
        world: &mut World,
        sampler: &dyn TextureSampler,
        rng: &mut ChaCha8Rng,
        kind: TextureKind,
        density: u8,
    ) -> u32 {
        let mut poured = 0;
        for _ in 0..TRIALS_PER_PASS {
            let (x, y) = random_cell(&self.config, rng);
            let radius = rng.gen_range(8..=23u16);
            if !roll(rng, density) {
                continue;
            }
            let open = world
                .grid
                .get(x, y)
                .is_some_and(|cell| cell.noise_value > self.config.dirt_threshold);
            if !open {
                continue;
            }
            alter(
                &mut world.grid,
                &mut world.fluids,
                sampler,
                &Brush::new(kind, radius, x, y),
            );
            poured += 1;
        }
        poured
    }

    fn moss_pass(
        &self,
        grid: &mut MaterialGrid,
        sampler: &dyn TextureSampler,
        rng: &mut ChaCha8Rng,
    ) -> u32 {
        let mut grown = 0;
        for _ in 0..TRIALS_PER_PASS {
            let (x, y) = random_cell(&self.config, rng);
            let radius = rng.gen_range(3..=8u16);
            if !roll(rng, self.config.moss_density) {
                continue;
            }
            for (cx, cy) in grid.circle(x, y, radius) {
                let Some(old) = grid.get(cx, cy) else {
                    continue;
                };
                if old.texture_kind != TextureKind::Dirt {
                    continue;
                }
                let moss = Cell::of_kind(TextureKind::Moss)
                    .with_noise(old.noise_value)
                    .with_color(sampler.sample_color(TextureKind::Moss, cx, cy));
                grid.set(cx, cy, moss);
            }
            grown += 1;
        }
        grown
    }
}

/// Uniformly random cell of the configured grid.
fn random_cell(config: &TerrainConfig, rng: &mut ChaCha8Rng) -> (i32, i32) {
    (
        rng.gen_range(0..config.width.max(1)),
        rng.gen_range(0..config.height.max(1)),
    )
}

/// True with probability `density / 255`.
fn roll(rng: &mut ChaCha8Rng, density: u8) -> bool {
    rng.gen_range(0..255u32) < u32::from(density)
}

/// One-shot generation.
///
/// # Errors
///
/// Returns an error if the config is invalid.
pub fn generate(config: &TerrainConfig, sampler: &dyn TextureSampler) -> ConfigResult<World> {
    Ok(TerrainGenerator::new(config.clone())?.generate(sampler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandfall_core::{Color, Material};

    fn sampler(kind: TextureKind, _x: i32, _y: i32) -> Color {
        match kind {
            TextureKind::Air => Color::TRANSPARENT,
            other => Color::rgb(other as u8, 0x40, 0x40),
        }
    }

    fn small(seed: u32) -> TerrainConfig {
        TerrainConfig {
            seed,
            width: 96,
            height: 64,
            noise_scale: 0.05,
            ..TerrainConfig::default()
        }
    }

    #[test]
    fn test_validate_rejects_bad_dimensions() {
        let config = TerrainConfig {
            width: 0,
            ..TerrainConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveDimension { width: 0, .. })
        ));

        let config = TerrainConfig {
            height: -4,
            ..TerrainConfig::default()
        };
        assert!(TerrainGenerator::new(config).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_scale() {
        for scale in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let config = TerrainConfig {
                noise_scale: scale,
                ..TerrainConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::InvalidNoiseScale(_))));
        }
    }

    #[test]
    fn test_validate_rejects_huge_grid() {
        let config = TerrainConfig {
            width: 100_000,
            height: 100_000,
            ..TerrainConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::GridTooLarge { .. })));
    }

    #[test]
    fn test_threshold_classification() {
        let config = TerrainConfig {
            object_density: 0,
            water_density: 0,
            lava_density: 0,
            ..small(3)
        };
        let world = generate(&config, &sampler).unwrap_or_else(|e| panic!("{e}"));

        for cell in world.grid.cells() {
            let expected = if cell.noise_value <= config.dirt_threshold {
                TextureKind::Dirt
            } else {
                TextureKind::Air
            };
            assert_eq!(cell.texture_kind, expected);
        }
        assert!(world.fluids.is_empty());
    }

    #[test]
    fn test_fluid_cells_are_indexed() {
        let config = TerrainConfig {
            water_density: 255,
            lava_density: 255,
            ..small(11)
        };
        let world = generate(&config, &sampler).unwrap_or_else(|e| panic!("{e}"));

        let mut fluids = world.fluids.clone();
        fluids.prepare(&world.grid);
        assert_eq!(fluids.len(), world.grid.count_fluid());
        for index in fluids.iter() {
            assert_eq!(world.grid.cell(index).map(|c| c.material), Some(Material::Fluid));
        }
    }

    #[test]
    fn test_rocks_are_indestructible() {
        let config = TerrainConfig {
            object_density: 255,
            ..small(5)
        };
        let world = generate(&config, &sampler).unwrap_or_else(|e| panic!("{e}"));

        assert!(world.grid.count_kind(TextureKind::Rock) > 0);
        for cell in world.grid.cells() {
            if cell.texture_kind == TextureKind::Rock {
                assert_eq!(cell.material, Material::SolidIndestructible);
            }
        }
    }

    #[test]
    fn test_moss_only_replaces_dirt() {
        let base = TerrainConfig {
            object_density: 0,
            water_density: 0,
            lava_density: 0,
            ..small(8)
        };
        let mossy = TerrainConfig {
            moss_density: 255,
            ..base.clone()
        };
        let plain = generate(&base, &sampler).unwrap_or_else(|e| panic!("{e}"));
        let grown = generate(&mossy, &sampler).unwrap_or_else(|e| panic!("{e}"));

        assert!(grown.grid.count_kind(TextureKind::Moss) > 0);
        assert_eq!(
            grown.grid.count_kind(TextureKind::Moss) + grown.grid.count_kind(TextureKind::Dirt),
            plain.grid.count_kind(TextureKind::Dirt)
        );
        assert_eq!(
            grown.grid.count_kind(TextureKind::Air),
            plain.grid.count_kind(TextureKind::Air)
        );
    }

    #[test]
    fn test_regenerate_matches_fresh_generator() {
        let mut generator = TerrainGenerator::new(small(1)).unwrap_or_else(|e| panic!("{e}"));
        let regenerated = generator.regenerate(77, &sampler);
        let fresh = generate(&small(77), &sampler).unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(regenerated.grid, fresh.grid);
        assert_eq!(regenerated.grid.seed(), 77);
        assert_eq!(generator.noise().seed(), 77);
    }
}

//! # SANDFALL Procedural Generation
//!
//! Deterministic terrain for the sand grid.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed always produces the same world
//! 2. **Layered**: Noise first, then rocks, fluid pockets and moss on top
//! 3. **Reseedable**: A generator can be pointed at a new seed in place
//!
//! ## Core Components
//!
//! - `NoiseField`: 2D gradient noise in `[-1, 1]`
//! - `Stencil`: Rock shapes stamped onto the terrain
//! - `TerrainGenerator`: Produces a `World` from a `TerrainConfig`
//!
//! ## Example
//!
//! ```rust,ignore
//! use sandfall_procedural::{TerrainConfig, TerrainGenerator};
//!
//! let mut generator = TerrainGenerator::new(TerrainConfig::default())?;
//! let world = generator.generate(&sampler);
//! let other = generator.regenerate(42, &sampler);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod noise;
pub mod stencil;
pub mod terrain;

pub use error::{ConfigError, ConfigResult};
pub use noise::{NoiseField, WorldSeed};
pub use stencil::Stencil;
pub use terrain::{generate, TerrainConfig, TerrainGenerator, MAX_CELLS, TRIALS_PER_PASS};

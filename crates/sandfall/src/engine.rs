//! # Engine
//!
//! Owns the terrain generator and the simulation and exposes the engine
//! lifecycle to a front end.
//!
//! ## Lifecycle
//!
//! ```text
//!   init ──> generate terrain ──> spawn workers
//!     │
//!     ├── step / begin_tick      one fluid tick, parallel over bands
//!     ├── alter / apply          terrain edits, between ticks only
//!     ├── regenerate             new world from a new seed
//!     ├── render                 blit the grid into a pixel sink
//!     │
//!   shutdown ──> join workers (also on drop)
//! ```

use std::ops::ControlFlow;
use std::sync::Arc;

use sandfall_core::{
    Brush, FluidSet, InFlightTick, MaterialGrid, PixelSink, Simulation, TextureSampler, TickStats,
    TickTimings, World,
};
use sandfall_procedural::TerrainGenerator;

use crate::command::Command;
use crate::config::{EngineConfig, MAX_TICKRATE};
use crate::error::EngineResult;
use crate::textures::ProceduralTextures;

/// The falling-sand engine.
pub struct Engine {
    config: EngineConfig,
    generator: TerrainGenerator,
    sim: Simulation,
}

impl Engine {
    /// Starts an engine with the built-in procedural textures.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the workers cannot be
    /// spawned.
    pub fn init(config: EngineConfig) -> EngineResult<Self> {
        Self::with_sampler(config, Arc::new(ProceduralTextures::default()))
    }

    /// Starts an engine with a caller-supplied texture source.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine and terrain settings
    /// * `sampler` - Colors for every generated or simulated cell
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the workers cannot be
    /// spawned.
    pub fn with_sampler(
        config: EngineConfig,
        sampler: Arc<dyn TextureSampler>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let generator = TerrainGenerator::new(config.terrain.clone())?;
        let world = generator.generate(sampler.as_ref());
        let sim = Simulation::with_bands(world, sampler, config.threads, config.bands)?;

        tracing::info!(
            seed = config.terrain.seed,
            threads = config.threads,
            tickrate = config.tickrate,
            "Engine initialized"
        );

        Ok(Self {
            config,
            generator,
            sim,
        })
    }

    /// Runs one tick to completion.
    pub fn step(&mut self) -> TickStats {
        self.sim.step()
    }

    /// Starts a tick and returns while the workers run it.
    ///
    /// The engine is borrowed until the returned tick is synced or dropped.
    pub fn begin_tick(&mut self) -> InFlightTick<'_> {
        self.sim.begin_tick()
    }

    /// Applies a brush. Returns the number of cells changed.
    pub fn alter(&mut self, brush: &Brush) -> usize {
        self.sim.alter(brush)
    }

    /// Replaces the world with a freshly generated one.
    pub fn regenerate(&mut self, seed: u32) {
        let sampler = Arc::clone(self.sim.sampler());
        let world = self.generator.regenerate(seed, sampler.as_ref());
        self.config.terrain.seed = seed;
        self.sim.replace_world(world);
    }

    /// Applies a front-end command.
    ///
    /// # Returns
    ///
    /// `ControlFlow::Break` once the engine should stop.
    pub fn apply(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::PourWater { x, y } => {
                self.alter(&Brush::water(x, y));
            }
            Command::PourLava { x, y } => {
                self.alter(&Brush::lava(x, y));
            }
            Command::Erase { x, y } => {
                self.alter(&Brush::erase(x, y));
            }
            Command::Paint(brush) => {
                self.alter(&brush);
            }
            Command::Regenerate { seed } => self.regenerate(seed),
            Command::TickrateUp => self.set_tickrate(self.config.tickrate.saturating_add(1)),
            Command::TickrateDown => self.set_tickrate(self.config.tickrate.saturating_sub(1)),
            Command::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Draws the grid into a pixel sink.
    pub fn render(&self, sink: &mut dyn PixelSink) {
        self.sim.render(sink);
    }

    /// The material grid.
    #[must_use]
    pub fn grid(&self) -> &MaterialGrid {
        self.sim.grid()
    }

    /// The fluid index.
    #[must_use]
    pub fn fluids(&self) -> &FluidSet {
        self.sim.fluids()
    }

    /// The whole world.
    #[must_use]
    pub fn world(&self) -> &World {
        self.sim.world()
    }

    /// Active settings. The terrain seed follows the last regeneration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying simulation.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.sim.tick_count()
    }

    /// Tick timing statistics.
    #[must_use]
    pub const fn timings(&self) -> TickTimings {
        self.sim.timings()
    }

    /// Target ticks per second.
    #[must_use]
    pub const fn tickrate(&self) -> u32 {
        self.config.tickrate
    }

    /// Sets the target tick rate, clamped to `1..=MAX_TICKRATE`.
    pub fn set_tickrate(&mut self, tickrate: u32) {
        let clamped = tickrate.clamp(1, MAX_TICKRATE);
        if clamped != self.config.tickrate {
            tracing::debug!(tickrate = clamped, "Tick rate changed");
        }
        self.config.tickrate = clamped;
    }

    /// Stops the workers. Later ticks run on the caller's thread.
    pub fn shutdown(&mut self) {
        tracing::info!(ticks = self.sim.tick_count(), "Engine shutting down");
        self.sim.shutdown();
    }
}

//! # SANDFALL Core Engine
//!
//! Concurrent falling-sand simulation over a destructible pixel grid:
//! - Flat `width * height` material grid, one `Cell` per pixel
//! - Fluid cellular automaton (water, lava, obsidian quenching)
//! - Fixed worker pool fed by a task queue, one barrier per tick
//!
//! ## Architecture Rules
//!
//! 1. **Disjoint bands** - Workers never touch the same row in one tick
//! 2. **Barrier before access** - Rendering and terrain edits only happen
//!    between ticks: every accessor waits for in-flight bands first
//! 3. **Whole-cell writes** - A cell is always replaced, never half-updated
//!
//! ## Example
//!
//! ```rust,ignore
//! use sandfall_core::{Brush, Simulation, World};
//!
//! let mut sim = Simulation::new(world, sampler, 4)?;
//! sim.alter(&Brush::water(120, 40));
//! let stats = sim.step();
//! sim.render(&mut framebuffer);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod fluid;
pub mod grid;
pub mod sim;
pub mod sync;
pub mod texture;

pub use error::{PoolError, PoolResult};
pub use fluid::{CellAccess, FluidRule, SpanStats, StepOutcome};
pub use grid::{alter, Brush, Cell, Color, FluidSet, Material, MaterialGrid, TextureKind, World};
pub use sim::{InFlightTick, Simulation, TickStats, TickTimings};
pub use sync::{
    partition, Partition, Partitioning, PoolState, Region, SharedWorld, SimulateTask, TaskExecutor,
    TaskQueue, WorkItem, WorkerPool,
};
pub use texture::{PixelSink, TextureSampler};

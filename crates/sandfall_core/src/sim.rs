//! # Simulation Driver
//!
//! Runs one fluid tick at a time across the worker pool.
//!
//! ## Tick Phases
//!
//! ```text
//!   begin_tick ─┬─ prepare fluid set (compact + sort)
//!               ├─ publish band access
//!               └─ enqueue one Simulate per band, then Barrier
//!   ──────────── workers step their bands in parallel ────────────
//!   sync ───────┬─ wait for the pool (barrier)
//!               ├─ step halo rows serially, top to bottom
//!               └─ update timings
//! ```
//!
//! [`InFlightTick`] mutably borrows the [`Simulation`], so the grid cannot be
//! read, rendered or altered until the tick has been synced. The borrow is a
//! convenience, not the guard: a tick whose token was leaked is settled by
//! the next accessor and finished by the next `&mut` call.

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use crate::error::PoolResult;
use crate::fluid::{FluidRule, SpanStats};
use crate::grid::{alter, Brush, FluidSet, MaterialGrid, World};
use crate::sync::partition::{partition, Partitioning};
use crate::sync::pool::WorkerPool;
use crate::sync::queue::WorkItem;
use crate::sync::shared::{SharedWorld, WorldHandle};
use crate::texture::{PixelSink, TextureSampler};

/// Statistics for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Simulate tasks handed to the pool.
    pub tasks: usize,
    /// Halo rows stepped serially.
    pub halo_rows: usize,
    /// Fluid counters over the parallel and serial phases.
    pub fluids: SpanStats,
    /// Wall time of the whole tick in microseconds.
    pub elapsed_us: u64,
}

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickTimings {
    /// Minimum tick duration observed.
    pub min_us: u64,
    /// Maximum tick duration observed.
    pub max_us: u64,
    /// Average tick duration (rolling).
    pub avg_us: u64,
    /// Total ticks measured.
    pub total_ticks: u64,
}

impl Default for TickTimings {
    fn default() -> Self {
        Self {
            min_us: u64::MAX,
            max_us: 0,
            avg_us: 0,
            total_ticks: 0,
        }
    }
}

impl TickTimings {
    fn record(&mut self, duration_us: u64) {
        self.min_us = self.min_us.min(duration_us);
        self.max_us = self.max_us.max(duration_us);
        self.avg_us = if self.total_ticks == 0 {
            duration_us
        } else {
            (self.avg_us * 15 + duration_us) / 16
        };
        self.total_ticks += 1;
    }
}

/// The tick driver: owns the world, the partitioning and the worker pool.
pub struct Simulation {
    handle: WorldHandle,
    partitioning: Partitioning,
    bands: usize,
    tick: u64,
    timings: TickTimings,
    pending: Option<PendingTick>,
}

/// Serial half of a tick whose bands were handed to the pool.
struct PendingTick {
    tick: u64,
    tasks: usize,
    halos: Vec<Range<usize>>,
    started: Instant,
}

impl Simulation {
    /// Creates a simulation with `2 * threads` bands.
    ///
    /// # Arguments
    ///
    /// * `world` - Generated world to simulate
    /// * `sampler` - Texture source for resampled colors
    /// * `threads` - Worker count; 0 runs every tick on the caller's thread
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned.
    pub fn new(world: World, sampler: Arc<dyn TextureSampler>, threads: usize) -> PoolResult<Self> {
        Self::with_bands(world, sampler, threads, 0)
    }

    /// Creates a simulation with an explicit band count.
    ///
    /// `bands == 0` picks `2 * max(threads, 1)`. The band count, not the
    /// thread count, decides the tick result: equal band counts give equal
    /// grids for any number of threads.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned.
    pub fn with_bands(
        world: World,
        sampler: Arc<dyn TextureSampler>,
        threads: usize,
        bands: usize,
    ) -> PoolResult<Self> {
        let bands = if bands == 0 { 2 * threads.max(1) } else { bands };
        let handle = WorldHandle::spawn(world, sampler, threads)?;

        let grid = &handle.world().grid;
        let partitioning = partition(grid.height(), grid.width(), bands);
        tracing::info!(
            width = grid.width(),
            height = grid.height(),
            threads,
            bands = partitioning.len(),
            "Simulation ready"
        );

        Ok(Self {
            handle,
            partitioning,
            bands,
            tick: 0,
            timings: TickTimings::default(),
            pending: None,
        })
    }

    /// Starts a tick: prepares the fluid set and hands the bands to the pool.
    ///
    /// The returned token must be synced (or dropped) before the simulation
    /// can be used again. A previous tick whose token was leaked is finished
    /// first.
    pub fn begin_tick(&mut self) -> InFlightTick<'_> {
        self.finish_pending();
        let started = Instant::now();
        self.tick += 1;

        let world = self.handle.world_mut();
        world.fluids.prepare(&world.grid);
        let items: Vec<WorkItem> = self.partitioning.tasks(&world.fluids).collect();
        let halos = self.partitioning.halo_spans(&world.fluids);
        let tasks = items.len();

        self.handle.begin(items);
        self.pending = Some(PendingTick {
            tick: self.tick,
            tasks,
            halos,
            started,
        });

        InFlightTick { sim: self }
    }

    /// Runs one full tick.
    pub fn step(&mut self) -> TickStats {
        self.begin_tick().sync()
    }

    /// The material grid.
    #[must_use]
    pub fn grid(&self) -> &MaterialGrid {
        &self.handle.world().grid
    }

    /// The fluid index.
    #[must_use]
    pub fn fluids(&self) -> &FluidSet {
        &self.handle.world().fluids
    }

    /// The whole world.
    #[must_use]
    pub fn world(&self) -> &World {
        self.handle.world()
    }

    /// Applies a brush. Returns the number of cells changed.
    pub fn alter(&mut self, brush: &Brush) -> usize {
        self.finish_pending();
        let sampler = Arc::clone(self.handle.sampler());
        let world = self.handle.world_mut();
        alter(&mut world.grid, &mut world.fluids, sampler.as_ref(), brush)
    }

    /// Swaps in a new world, for example after regeneration.
    ///
    /// Bands are recut if the size changed.
    ///
    /// # Returns
    ///
    /// The previous world.
    pub fn replace_world(&mut self, world: World) -> World {
        self.finish_pending();
        let (width, height) = (world.grid.width(), world.grid.height());
        if width != self.partitioning.width() || height != self.partitioning.height() {
            self.partitioning = partition(height, width, self.bands);
        }
        std::mem::replace(self.handle.world_mut(), world)
    }

    /// Draws every non-transparent cell into a pixel sink.
    pub fn render(&self, sink: &mut dyn PixelSink) {
        self.grid().render(sink);
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Tick timing statistics.
    #[must_use]
    pub const fn timings(&self) -> TickTimings {
        self.timings
    }

    /// Current band layout.
    #[must_use]
    pub const fn partitioning(&self) -> &Partitioning {
        &self.partitioning
    }

    /// The worker pool, once any in-flight band work has completed.
    #[must_use]
    pub fn pool(&self) -> &WorkerPool<SharedWorld> {
        self.handle.pool()
    }

    /// Texture source used for resampled colors.
    #[must_use]
    pub fn sampler(&self) -> &Arc<dyn TextureSampler> {
        self.handle.sampler()
    }

    /// Stops the workers. Later ticks run inline.
    pub fn shutdown(&mut self) {
        self.finish_pending();
        self.handle.pool_mut().shutdown();
    }

    /// Waits for the barrier, steps the halo rows and records the tick.
    /// Returns `None` if no tick is open.
    fn finish_pending(&mut self) -> Option<TickStats> {
        let pending = self.pending.take()?;

        self.handle.settle();
        let mut fluids = self.handle.take_parallel();
        let sampler = Arc::clone(self.handle.sampler());
        let rule = FluidRule::new(sampler.as_ref());
        let World { grid, fluids: set } = self.handle.world_mut();
        for span in &pending.halos {
            if let Some(entries) = set.entries_mut().get_mut(span.clone()) {
                fluids += rule.step_span(entries, grid);
            }
        }

        let elapsed_us = u64::try_from(pending.started.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.timings.record(elapsed_us);

        let stats = TickStats {
            tick: pending.tick,
            tasks: pending.tasks,
            halo_rows: pending.halos.len(),
            fluids,
            elapsed_us,
        };
        tracing::trace!(
            tick = stats.tick,
            visited = stats.fluids.visited,
            moved = stats.fluids.moved,
            elapsed_us,
            "Tick complete"
        );
        Some(stats)
    }
}

/// A tick whose bands are being simulated.
///
/// Call [`InFlightTick::sync`] to wait for it. Dropping the token syncs too.
pub struct InFlightTick<'a> {
    sim: &'a mut Simulation,
}

impl InFlightTick<'_> {
    /// Tick number.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.sim.tick
    }

    /// Returns true while workers may still be running this tick's bands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sim.pending.is_some() && self.sim.handle.outstanding() > 0
    }

    /// Waits for the barrier, steps the halo rows and returns the tick stats.
    pub fn sync(self) -> TickStats {
        self.sim.finish_pending().unwrap_or_default()
    }
}

impl Drop for InFlightTick<'_> {
    fn drop(&mut self) {
        let _ = self.sim.finish_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, Color, TextureKind};

    fn sampler() -> Arc<dyn TextureSampler> {
        Arc::new(|kind: TextureKind, x: i32, y: i32| match kind {
            TextureKind::Air => Color::TRANSPARENT,
            other => Color::from_argb(0xFF, other as u8, x as u8, y as u8),
        })
    }

    fn column_world() -> World {
        let mut world = World::empty(8, 32, 7);
        for x in 0..8 {
            world.put(x, 30, Cell::of_kind(TextureKind::Dirt));
        }
        for y in 0..6 {
            world.put(3, y, Cell::of_kind(TextureKind::Water));
            world.put(5, y, Cell::of_kind(TextureKind::Lava));
        }
        world
    }

    #[test]
    fn test_scenario_water_falls() {
        let mut world = World::empty(4, 4, 0);
        world.put(1, 1, Cell::of_kind(TextureKind::Water));
        let mut sim = Simulation::new(world, sampler(), 2).unwrap_or_else(|e| panic!("{e}"));

        let stats = sim.step();

        assert_eq!(stats.tick, 1);
        assert_eq!(sim.grid().get(1, 2).map(|c| c.texture_kind), Some(TextureKind::Water));
        assert_eq!(sim.grid().get(1, 1), Some(Cell::VOID));
        assert_eq!(sim.tick_count(), 1);
    }

    #[test]
    fn test_scenario_water_on_lava() {
        let mut world = World::empty(4, 4, 0);
        world.put(0, 0, Cell::of_kind(TextureKind::Water));
        world.put(0, 1, Cell::of_kind(TextureKind::Lava));
        let mut sim = Simulation::with_bands(world, sampler(), 2, 1).unwrap_or_else(|e| panic!("{e}"));

        sim.step();

        assert_eq!(
            sim.grid().get(0, 1).map(|c| c.texture_kind),
            Some(TextureKind::Obsidian)
        );
        assert_eq!(sim.grid().count_kind(TextureKind::Water), 1);
    }

    #[test]
    fn test_thread_count_does_not_change_result() {
        let mut inline = Simulation::with_bands(column_world(), sampler(), 0, 4)
            .unwrap_or_else(|e| panic!("{e}"));
        let mut threaded = Simulation::with_bands(column_world(), sampler(), 3, 4)
            .unwrap_or_else(|e| panic!("{e}"));

        for _ in 0..40 {
            inline.step();
            threaded.step();
            assert_eq!(inline.grid().checksum(), threaded.grid().checksum());
        }
    }

    #[test]
    fn test_fluids_never_created_by_ticks() {
        let mut sim = Simulation::new(column_world(), sampler(), 3).unwrap_or_else(|e| panic!("{e}"));
        let mut previous = sim.grid().count_fluid();
        for _ in 0..60 {
            sim.step();
            let now = sim.grid().count_fluid();
            assert!(now <= previous);
            previous = now;
        }
    }

    #[test]
    fn test_dropped_tick_is_synced() {
        let mut sim = Simulation::new(column_world(), sampler(), 2).unwrap_or_else(|e| panic!("{e}"));
        {
            let tick = sim.begin_tick();
            assert_eq!(tick.tick(), 1);
        }
        assert_eq!(sim.pool().outstanding(), 0);
        assert!(!sim.pool().executor().in_tick());
        assert_eq!(sim.timings().total_ticks, 1);
    }

    #[test]
    fn test_leaked_tick_is_settled_before_access() {
        let mut sim = Simulation::with_bands(column_world(), sampler(), 4, 8)
            .unwrap_or_else(|e| panic!("{e}"));
        let mut reference = Simulation::with_bands(column_world(), sampler(), 0, 8)
            .unwrap_or_else(|e| panic!("{e}"));

        std::mem::forget(sim.begin_tick());

        // Reading waits for the workers and revokes their band access.
        let _ = sim.grid().count_fluid();
        assert!(!sim.handle.in_tick());
        assert_eq!(sim.handle.outstanding(), 0);

        // The next tick finishes the leaked one first.
        let stats = sim.step();
        reference.step();
        reference.step();
        assert_eq!(stats.tick, 2);
        assert_eq!(sim.timings().total_ticks, 2);
        assert_eq!(sim.grid().checksum(), reference.grid().checksum());
    }

    #[test]
    fn test_leaked_tick_is_finished_before_edits() {
        let mut sim = Simulation::with_bands(column_world(), sampler(), 3, 6)
            .unwrap_or_else(|e| panic!("{e}"));
        let fluids = sim.grid().count_fluid();

        std::mem::forget(sim.begin_tick());
        let old = sim.replace_world(World::empty(8, 32, 1));
        assert_eq!(old.grid.count_fluid(), fluids);
        assert_eq!(sim.timings().total_ticks, 1);

        std::mem::forget(sim.begin_tick());
        assert!(sim.alter(&Brush::water(4, 4)) > 0);
        assert_eq!(sim.timings().total_ticks, 2);
        assert!(!sim.handle.in_tick());
    }

    #[test]
    fn test_alter_between_ticks() {
        let mut sim = Simulation::new(World::empty(32, 32, 0), sampler(), 2).unwrap_or_else(|e| panic!("{e}"));
        let changed = sim.alter(&Brush::water(16, 4));
        assert!(changed > 0);
        assert_eq!(sim.fluids().len(), changed);

        let stats = sim.step();
        assert_eq!(stats.fluids.visited as usize, changed);
    }

    #[test]
    fn test_replace_world_recuts_bands() {
        let mut sim = Simulation::with_bands(World::empty(8, 8, 0), sampler(), 1, 4)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(sim.partitioning().height(), 8);

        let old = sim.replace_world(World::empty(16, 40, 1));
        assert_eq!(old.grid.height(), 8);
        assert_eq!(sim.partitioning().height(), 40);
        assert_eq!(sim.partitioning().len(), 4);
        sim.step();
    }

    #[test]
    fn test_ticks_continue_after_shutdown() {
        let mut world = World::empty(4, 4, 0);
        world.put(2, 0, Cell::of_kind(TextureKind::Water));
        let mut sim = Simulation::new(world, sampler(), 2).unwrap_or_else(|e| panic!("{e}"));
        sim.shutdown();
        sim.step();
        assert_eq!(sim.grid().get(2, 1).map(|c| c.texture_kind), Some(TextureKind::Water));
    }
}

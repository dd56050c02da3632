//! # Shared World
//!
//! Hands disjoint row bands of the grid to worker threads.
//!
//! ## Safety Note
//!
//! Workers write the grid in place through raw pointers. All unsafe code of
//! the crate lives in this module.

#![allow(unsafe_code)]
//!
//! ## Access Protocol
//!
//! ```text
//!   WorldHandle (driver, unique)            SharedWorld (Arc, workers)
//!   ──────────────────────────              ──────────────────────────
//!   begin(&mut self) ──> TickFrame published ──> execute(task):
//!                                                  band view over rows [y0, y1)
//!                                                  fluid entries [span]
//!   settle ──> pool.sync(), frame cleared
//!   world() / world_mut() / pool()  ──> settle first
//! ```
//!
//! Every driver path into the world or the pool settles before it returns,
//! so a reference into the world never coexists with published band views,
//! even if the tick token was leaked. Bands never share a row and fluid
//! spans never overlap, so no two workers touch the same memory.

use std::cell::UnsafeCell;
use std::ops::Range;
use std::sync::Arc;

use parking_lot::Mutex;

use super::pool::{TaskExecutor, WorkerPool};
use super::queue::{SimulateTask, WorkItem};
use crate::error::PoolResult;
use crate::fluid::{CellAccess, FluidRule, SpanStats};
use crate::grid::{Cell, World};
use crate::texture::TextureSampler;

/// Raw view of the world captured at the start of a tick.
#[derive(Clone, Copy)]
struct TickFrame {
    cells: *mut Cell,
    cells_len: usize,
    entries: *mut usize,
    entries_len: usize,
    width: u32,
    height: u32,
}

// SAFETY: The pointers are only dereferenced by `SharedWorld::execute`
// while the frame is published. `WorldHandle` settles before any driver
// borrow of the world, so the buffers stay alive and unaliased.
unsafe impl Send for TickFrame {}

/// The world as seen by the worker pool.
pub struct SharedWorld {
    world: UnsafeCell<World>,
    sampler: Arc<dyn TextureSampler>,
    frame: Mutex<Option<TickFrame>>,
    parallel: Mutex<SpanStats>,
}

// SAFETY: The world is only reached through `WorldHandle` (exclusive, between
// ticks) or through a captured frame (disjoint bands, during a tick).
unsafe impl Sync for SharedWorld {}

impl SharedWorld {
    /// Texture source used for resampled colors.
    #[must_use]
    pub fn sampler(&self) -> &Arc<dyn TextureSampler> {
        &self.sampler
    }

    /// Returns true while a tick is in flight.
    #[must_use]
    pub fn in_tick(&self) -> bool {
        self.frame.lock().is_some()
    }
}

impl TaskExecutor for SharedWorld {
    fn execute(&self, task: &SimulateTask) -> SpanStats {
        let Some(frame) = *self.frame.lock() else {
            tracing::warn!(region = ?task.region(), "Simulate task outside of a tick, skipped");
            return SpanStats::default();
        };

        let span = task.fluids();
        let region = task.region();
        let rows_end = region.y1.min(frame.height);
        if span.start > span.end || span.end > frame.entries_len || region.y0 > rows_end {
            tracing::warn!(?span, ?region, "Simulate task does not fit the frame, skipped");
            return SpanStats::default();
        }

        let mut band = BandMut {
            cells: frame.cells,
            cells_len: frame.cells_len,
            width: frame.width,
            height: frame.height,
            rows: region.y0..rows_end,
        };

        // SAFETY: `span` lies within the entry buffer captured for this tick,
        // and the partitioner hands every task a disjoint span.
        let entries =
            unsafe { std::slice::from_raw_parts_mut(frame.entries.add(span.start), span.len()) };

        FluidRule::new(self.sampler.as_ref()).step_span(entries, &mut band)
    }
}

/// Mutable view over a row band of the grid.
struct BandMut {
    cells: *mut Cell,
    cells_len: usize,
    width: u32,
    height: u32,
    rows: Range<u32>,
}

impl BandMut {
    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        if x >= self.width || !self.rows.contains(&y) {
            return None;
        }
        let index = x as usize + y as usize * self.width as usize;
        (index < self.cells_len).then_some(index)
    }
}

impl CellAccess for BandMut {
    #[inline]
    fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        let index = self.index(x, y)?;
        // SAFETY: `index` is inside the captured buffer and inside this
        // band's rows, which no other worker touches this tick.
        Some(unsafe { self.cells.add(index).read() })
    }

    #[inline]
    fn put(&mut self, x: i32, y: i32, cell: Cell) {
        let Some(index) = self.index(x, y) else {
            debug_assert!(false, "band write outside rows {:?}: ({x}, {y})", self.rows);
            return;
        };
        // SAFETY: Same as `cell`.
        unsafe { self.cells.add(index).write(cell) }
    }
}

/// Driver-side owner of the shared world and of the pool that works on it.
/// Exactly one exists per world.
pub(crate) struct WorldHandle {
    shared: Arc<SharedWorld>,
    pool: WorkerPool<SharedWorld>,
}

impl WorldHandle {
    pub(crate) fn spawn(
        world: World,
        sampler: Arc<dyn TextureSampler>,
        threads: usize,
    ) -> PoolResult<Self> {
        let shared = Arc::new(SharedWorld {
            world: UnsafeCell::new(world),
            sampler,
            frame: Mutex::new(None),
            parallel: Mutex::new(SpanStats::default()),
        });
        let pool = WorkerPool::spawn(threads, Arc::clone(&shared))?;
        Ok(Self { shared, pool })
    }

    pub(crate) fn sampler(&self) -> &Arc<dyn TextureSampler> {
        &self.shared.sampler
    }

    /// The pool, settled first.
    pub(crate) fn pool(&self) -> &WorkerPool<SharedWorld> {
        self.settle();
        &self.pool
    }

    pub(crate) fn pool_mut(&mut self) -> &mut WorkerPool<SharedWorld> {
        self.settle();
        &mut self.pool
    }

    /// Items queued and not yet completed. Does not wait.
    pub(crate) fn outstanding(&self) -> usize {
        self.pool.outstanding()
    }

    pub(crate) fn world(&self) -> &World {
        self.settle();
        // SAFETY: `settle` waited for the workers and revoked band access.
        // Publishing again takes `&mut self`, which cannot coexist with
        // this borrow.
        unsafe { &*self.shared.world.get() }
    }

    pub(crate) fn world_mut(&mut self) -> &mut World {
        self.settle();
        // SAFETY: As in `world`, and `&mut self` excludes other driver borrows.
        unsafe { &mut *self.shared.world.get() }
    }

    /// Publishes raw band access and queues the tick's items and a barrier.
    ///
    /// Access stays published until the next [`WorldHandle::settle`]. Every
    /// other way into the world or the pool settles first, so nothing here
    /// depends on a guard being dropped.
    pub(crate) fn begin(&mut self, items: Vec<WorkItem>) {
        let world = self.world_mut();
        let width = world.grid.width();
        let height = world.grid.height();
        let cells = world.grid.cells_mut();
        let (cells_len, cells) = (cells.len(), cells.as_mut_ptr());
        let entries = world.fluids.entries_mut();
        let (entries_len, entries) = (entries.len(), entries.as_mut_ptr());

        *self.shared.frame.lock() = Some(TickFrame {
            cells,
            cells_len,
            entries,
            entries_len,
            width,
            height,
        });
        for item in items {
            self.pool.enqueue(item);
        }
        self.pool.enqueue(WorkItem::Barrier);
    }

    /// Waits for published band work and revokes access. No-op between ticks.
    pub(crate) fn settle(&self) {
        // Workers lock the frame too, so it must not be held across `sync`.
        if self.shared.frame.lock().is_none() {
            return;
        }
        let stats = self.pool.sync();
        *self.shared.parallel.lock() += stats;
        *self.shared.frame.lock() = None;
    }

    /// Fluid counters of the parallel phase since the last call.
    pub(crate) fn take_parallel(&self) -> SpanStats {
        std::mem::take(&mut *self.shared.parallel.lock())
    }

    #[cfg(test)]
    pub(crate) fn in_tick(&self) -> bool {
        self.shared.in_tick()
    }
}

impl Drop for WorldHandle {
    fn drop(&mut self) {
        self.settle();
    }
}

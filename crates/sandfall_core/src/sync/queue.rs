//! # Task Queue
//!
//! FIFO of owned work items shared by the tick driver and the workers.
//!
//! ```text
//!   Driver ──push──> [Mutex<VecDeque>] ──pull──> Worker 1..N
//!                         │
//!                   not_empty (Condvar)
//! ```
//!
//! Submission order is preserved per producer. Which worker gets which item
//! is a race, so no processing order holds across workers.

use std::collections::VecDeque;
use std::ops::Range;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A rectangle of rows handed to one worker.
///
/// Regions always span the full grid width: the partitioner cuts rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    /// First row (inclusive).
    pub y0: u32,
    /// Last row (exclusive).
    pub y1: u32,
    /// First column (inclusive).
    pub x0: u32,
    /// Last column (exclusive).
    pub x1: u32,
}

impl Region {
    /// Full-width region over a row range.
    #[must_use]
    pub const fn rows(rows: Range<u32>, width: u32) -> Self {
        Self {
            y0: rows.start,
            y1: rows.end,
            x0: 0,
            x1: width,
        }
    }

    /// Flat cell-index range covered by the region's rows.
    #[must_use]
    pub fn cell_range(&self, width: u32) -> Range<usize> {
        let width = width as usize;
        self.y0 as usize * width..self.y1 as usize * width
    }

    /// Returns true if the region holds no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.y0 >= self.y1 || self.x0 >= self.x1
    }

    /// Returns true if the coordinates fall inside the region.
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return false;
        };
        (self.x0..self.x1).contains(&x) && (self.y0..self.y1).contains(&y)
    }
}

/// One band of fluid simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulateTask {
    region: Region,
    fluids: Range<usize>,
}

impl SimulateTask {
    pub(crate) const fn new(region: Region, fluids: Range<usize>) -> Self {
        Self { region, fluids }
    }

    /// Rows this task may read and write.
    #[must_use]
    pub const fn region(&self) -> Region {
        self.region
    }

    /// Span of the prepared fluid set this task steps.
    #[must_use]
    pub fn fluids(&self) -> Range<usize> {
        self.fluids.clone()
    }
}

/// Item carried by the task queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkItem {
    /// Run the fluid rule over one band.
    Simulate(SimulateTask),
    /// End-of-tick marker. Workers record it as a fence.
    Barrier,
}

/// Thread-safe FIFO queue.
pub struct TaskQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
        }
    }

    /// Appends an item and wakes one waiting consumer.
    pub fn push(&self, item: T) {
        self.items.lock().push_back(item);
        self.not_empty.notify_one();
    }

    /// Takes the oldest item without blocking.
    #[must_use]
    pub fn pull(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Takes the oldest item, waiting up to `timeout` for one to arrive.
    #[must_use]
    pub fn pull_timeout(&self, timeout: Duration) -> Option<T> {
        let mut items = self.items.lock();
        if items.is_empty() {
            self.not_empty.wait_for(&mut items, timeout);
        }
        items.pop_front()
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Wakes every waiting consumer.
    pub(crate) fn notify_all(&self) {
        self.not_empty.notify_all();
    }
}

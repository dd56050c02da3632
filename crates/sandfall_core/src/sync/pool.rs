//! # Worker Pool
//!
//! A fixed set of OS threads draining the [`TaskQueue`].
//!
//! ## Lifecycle
//!
//! ```text
//!   spawn(n) ──> workers idle on the queue (bounded condvar wait)
//!      │
//!   enqueue ──> outstanding += 1 ──> worker: Idle -> Busy -> Idle
//!      │                                      outstanding -= 1
//!   sync ──> blocks until outstanding == 0 (all_done condvar)
//!      │
//!   shutdown / Drop ──> running = false, wake all, join
//! ```
//!
//! With zero threads the pool degrades to inline mode: `sync` runs every
//! queued item on the calling thread.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::queue::{SimulateTask, TaskQueue, WorkItem};
use crate::error::{PoolError, PoolResult};
use crate::fluid::SpanStats;

/// How long an idle worker waits on the queue before re-checking `running`.
const IDLE_WAIT: Duration = Duration::from_millis(2);

/// Runs simulate tasks on behalf of the pool.
pub trait TaskExecutor: Send + Sync + 'static {
    /// Executes one task. Called from worker threads.
    fn execute(&self, task: &SimulateTask) -> SpanStats;
}

/// Aggregate pool state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolState {
    /// No worker is running a task.
    AllIdle,
    /// At least one worker is running a task.
    AnyBusy,
}

/// State shared between the pool handle and its workers.
struct PoolShared<E> {
    queue: TaskQueue<WorkItem>,
    executor: Arc<E>,
    running: AtomicBool,
    /// Per-worker idle flag.
    idle: Mutex<HashMap<ThreadId, bool>>,
    idle_count: AtomicUsize,
    total_count: AtomicUsize,
    /// Items enqueued but not yet completed.
    outstanding: Mutex<usize>,
    all_done: Condvar,
    fences: AtomicU64,
    stats: Mutex<SpanStats>,
}

impl<E: TaskExecutor> PoolShared<E> {
    fn register(&self, id: ThreadId) {
        let mut idle = self.idle.lock();
        if let std::collections::hash_map::Entry::Vacant(slot) = idle.entry(id) {
            slot.insert(true);
            self.idle_count.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn set_idle(&self, id: ThreadId, now_idle: bool) {
        let mut idle = self.idle.lock();
        let previous = idle.insert(id, now_idle);
        match (previous, now_idle) {
            (Some(false) | None, true) => {
                self.idle_count.fetch_add(1, Ordering::AcqRel);
            }
            (Some(true), false) => {
                self.idle_count.fetch_sub(1, Ordering::AcqRel);
            }
            _ => {}
        }
    }

    fn execute(&self, item: &WorkItem) {
        match item {
            WorkItem::Simulate(task) => {
                let stats = self.executor.execute(task);
                *self.stats.lock() += stats;
            }
            WorkItem::Barrier => {
                self.fences.fetch_add(1, Ordering::AcqRel);
            }
        }
    }

    fn complete(&self) {
        let mut outstanding = self.outstanding.lock();
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.all_done.notify_all();
        }
    }

    fn worker_loop(&self) {
        let _guard = AbortOnPanic;
        let id = thread::current().id();

        while self.running.load(Ordering::Acquire) {
            let Some(item) = self.queue.pull_timeout(IDLE_WAIT) else {
                continue;
            };
            self.set_idle(id, false);
            self.execute(&item);
            self.set_idle(id, true);
            self.complete();
        }
    }
}

/// Aborts the process if a worker unwinds.
///
/// A half-stepped band leaves the grid in an unknown state, so there is
/// nothing to recover.
struct AbortOnPanic;

impl Drop for AbortOnPanic {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::error!(
                thread = ?thread::current().name(),
                "Simulation worker panicked, aborting"
            );
            std::process::abort();
        }
    }
}

/// Fixed-size pool of simulation workers.
pub struct WorkerPool<E: TaskExecutor> {
    shared: Arc<PoolShared<E>>,
    handles: Vec<JoinHandle<()>>,
}

impl<E: TaskExecutor> WorkerPool<E> {
    /// Starts `threads` workers.
    ///
    /// # Arguments
    ///
    /// * `threads` - Worker count; 0 selects inline mode
    /// * `executor` - Runs the simulate items
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Spawn`] if the OS refuses a thread. Workers that
    /// did start are shut down and joined first.
    pub fn spawn(threads: usize, executor: Arc<E>) -> PoolResult<Self> {
        let shared = Arc::new(PoolShared {
            queue: TaskQueue::new(),
            executor,
            running: AtomicBool::new(true),
            idle: Mutex::new(HashMap::with_capacity(threads)),
            idle_count: AtomicUsize::new(0),
            total_count: AtomicUsize::new(0),
            outstanding: Mutex::new(0),
            all_done: Condvar::new(),
            fences: AtomicU64::new(0),
            stats: Mutex::new(SpanStats::default()),
        });

        let mut pool = Self {
            shared,
            handles: Vec::with_capacity(threads),
        };

        if threads == 0 {
            tracing::warn!("Worker pool started with 0 threads, running ticks inline");
            return Ok(pool);
        }

        for index in 0..threads {
            let worker = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("sandfall-worker-{index}"))
                .spawn(move || worker.worker_loop())
                .map_err(|source| PoolError::Spawn { index, source })?;

            pool.shared.register(handle.thread().id());
            pool.shared.total_count.fetch_add(1, Ordering::AcqRel);
            pool.handles.push(handle);
        }

        tracing::info!(threads, "Worker pool started");
        Ok(pool)
    }

    /// Queues an item.
    pub fn enqueue(&self, item: WorkItem) {
        *self.shared.outstanding.lock() += 1;
        self.shared.queue.push(item);
    }

    /// Blocks until every queued item has completed.
    ///
    /// In inline mode (or after shutdown) the queued items run here, on the
    /// calling thread.
    ///
    /// # Returns
    ///
    /// Fluid statistics accumulated since the previous `sync`.
    pub fn sync(&self) -> SpanStats {
        if self.handles.is_empty() || !self.shared.running.load(Ordering::Acquire) {
            while let Some(item) = self.shared.queue.pull() {
                self.shared.execute(&item);
                self.shared.complete();
            }
        }

        let mut outstanding = self.shared.outstanding.lock();
        while *outstanding > 0 {
            self.shared.all_done.wait(&mut outstanding);
        }
        drop(outstanding);

        std::mem::take(&mut *self.shared.stats.lock())
    }

    /// Stops and joins every worker. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.shared.queue.notify_all();

        let joined = self.handles.len();
        for handle in self.handles.drain(..) {
            // A panicked worker has already aborted the process.
            let _ = handle.join();
        }
        self.shared.total_count.store(0, Ordering::Release);
        self.shared.idle_count.store(0, Ordering::Release);
        self.shared.idle.lock().clear();

        tracing::debug!(threads = joined, "Worker pool shut down");
    }

    /// Number of worker threads.
    #[must_use]
    pub fn total_threads(&self) -> usize {
        self.shared.total_count.load(Ordering::Acquire)
    }

    /// Number of workers waiting for work.
    #[must_use]
    pub fn idle_threads(&self) -> usize {
        self.shared.idle_count.load(Ordering::Acquire)
    }

    /// Number of workers running a task.
    #[must_use]
    pub fn busy_threads(&self) -> usize {
        self.total_threads().saturating_sub(self.idle_threads())
    }

    /// Returns true if any worker is running a task.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy_threads() > 0
    }

    /// Returns the idle flag of a worker, or `None` for unknown threads.
    #[must_use]
    pub fn is_idle(&self, id: ThreadId) -> Option<bool> {
        self.shared.idle.lock().get(&id).copied()
    }

    /// Aggregate state.
    #[must_use]
    pub fn state(&self) -> PoolState {
        if self.is_busy() {
            PoolState::AnyBusy
        } else {
            PoolState::AllIdle
        }
    }

    /// Returns true if the pool runs items on the caller's thread.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.handles.is_empty()
    }

    /// Thread ids of the workers.
    #[must_use]
    pub fn thread_ids(&self) -> Vec<ThreadId> {
        self.handles.iter().map(|h| h.thread().id()).collect()
    }

    /// Number of barrier items processed so far.
    #[must_use]
    pub fn fences(&self) -> u64 {
        self.shared.fences.load(Ordering::Acquire)
    }

    /// Number of items not yet completed.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        *self.shared.outstanding.lock()
    }

    /// The executor the workers run.
    #[must_use]
    pub fn executor(&self) -> &Arc<E> {
        &self.shared.executor
    }
}

impl<E: TaskExecutor> Drop for WorkerPool<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::queue::Region;

    #[derive(Default)]
    struct Counter {
        runs: AtomicU64,
    }

    impl TaskExecutor for Counter {
        fn execute(&self, task: &SimulateTask) -> SpanStats {
            self.runs.fetch_add(1, Ordering::AcqRel);
            SpanStats {
                visited: task.fluids().len() as u64,
                ..SpanStats::default()
            }
        }
    }

    fn task(fluids: std::ops::Range<usize>) -> WorkItem {
        WorkItem::Simulate(SimulateTask::new(Region::rows(0..1, 1), fluids))
    }

    #[test]
    fn test_spawn_and_shutdown() {
        let mut pool = WorkerPool::spawn(3, Arc::new(Counter::default())).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(pool.total_threads(), 3);
        assert_eq!(pool.idle_threads(), 3);
        assert_eq!(pool.state(), PoolState::AllIdle);
        for id in pool.thread_ids() {
            assert_eq!(pool.is_idle(id), Some(true));
        }

        pool.shutdown();
        pool.shutdown();
        assert_eq!(pool.total_threads(), 0);
    }

    #[test]
    fn test_sync_waits_for_all_items() {
        let pool = WorkerPool::spawn(4, Arc::new(Counter::default())).unwrap_or_else(|e| panic!("{e}"));
        for i in 0..64 {
            pool.enqueue(task(0..i));
        }
        pool.enqueue(WorkItem::Barrier);

        let stats = pool.sync();

        assert_eq!(pool.executor().runs.load(Ordering::Acquire), 64);
        assert_eq!(stats.visited, (0..64).sum::<u64>());
        assert_eq!(pool.fences(), 1);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.state(), PoolState::AllIdle);
    }

    #[test]
    fn test_zero_threads_runs_inline() {
        let pool = WorkerPool::spawn(0, Arc::new(Counter::default())).unwrap_or_else(|e| panic!("{e}"));
        assert!(pool.is_inline());
        pool.enqueue(task(0..5));
        pool.enqueue(WorkItem::Barrier);
        assert_eq!(pool.executor().runs.load(Ordering::Acquire), 0);

        let stats = pool.sync();
        assert_eq!(stats.visited, 5);
        assert_eq!(pool.fences(), 1);
    }

    #[test]
    fn test_sync_after_shutdown_drains_inline() {
        let mut pool = WorkerPool::spawn(2, Arc::new(Counter::default())).unwrap_or_else(|e| panic!("{e}"));
        pool.shutdown();
        pool.enqueue(task(0..2));
        assert_eq!(pool.sync().visited, 2);
    }

    #[test]
    fn test_stats_reset_between_syncs() {
        let pool = WorkerPool::spawn(2, Arc::new(Counter::default())).unwrap_or_else(|e| panic!("{e}"));
        pool.enqueue(task(0..3));
        assert_eq!(pool.sync().visited, 3);
        assert_eq!(pool.sync().visited, 0);
    }
}

//! # Parallel Tick Machinery
//!
//! Everything that moves work between the tick driver and the workers.
//!
//! - [`partition`]: row bands with halo rows, one task per band
//! - [`TaskQueue`]: FIFO of owned [`WorkItem`]s
//! - [`WorkerPool`]: fixed worker threads with idle/busy tracking and `sync`
//! - [`SharedWorld`]: band-disjoint access to the grid from workers

pub mod partition;
pub mod pool;
pub mod queue;
pub mod shared;

pub use partition::{partition, Partition, Partitioning};
pub use pool::{PoolState, TaskExecutor, WorkerPool};
pub use queue::{Region, SimulateTask, TaskQueue, WorkItem};
pub use shared::SharedWorld;

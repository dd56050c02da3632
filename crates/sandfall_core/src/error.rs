//! # Core Error Types
//!
//! Errors surfaced by the worker pool. Grid indexing never errors: every
//! coordinate is bounds-checked before it is turned into an index.

use thiserror::Error;

/// Errors that can occur while bringing up the worker pool.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The OS refused to start a worker thread.
    #[error("failed to spawn simulation worker {index}: {source}")]
    Spawn {
        /// Index of the worker that failed to start.
        index: usize,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

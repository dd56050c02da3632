//! Error types for the engine facade.

use std::io;
use std::path::PathBuf;

use sandfall_core::PoolError;
use sandfall_procedural::ConfigError;
use thiserror::Error;

/// Errors raised while starting or reconfiguring the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Terrain config rejected.
    #[error("invalid terrain config: {0}")]
    Config(#[from] ConfigError),

    /// Worker pool could not start.
    #[error("worker pool failed: {0}")]
    Pool(#[from] PoolError),

    /// Engine setting out of range.
    #[error("invalid engine setting `{field}`: {reason}")]
    Setting {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Config file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML for `EngineConfig`.
    #[error("cannot parse config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Config could not be written as TOML.
    #[error("cannot serialize config: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

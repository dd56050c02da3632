//! # Generation Error Types
//!
//! Configuration problems are caught before any grid memory is allocated.

use thiserror::Error;

/// Errors raised by terrain configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Width or height is zero or negative.
    #[error("grid dimensions must be positive, got {width}x{height}")]
    NonPositiveDimension {
        /// Requested width.
        width: i32,
        /// Requested height.
        height: i32,
    },

    /// Noise scale is zero, negative or not finite.
    #[error("noise scale must be a positive finite number, got {0}")]
    InvalidNoiseScale(f32),

    /// The grid would exceed the cell limit.
    #[error("grid of {cells} cells exceeds the limit of {limit}")]
    GridTooLarge {
        /// Requested cell count.
        cells: u64,
        /// Maximum cell count.
        limit: u64,
    },

    /// Stencil pixel data does not match its dimensions.
    #[error("stencil of {width}x{height} needs {expected} pixels, got {actual}")]
    StencilSize {
        /// Stencil width.
        width: u32,
        /// Stencil height.
        height: u32,
        /// `width * height`.
        expected: usize,
        /// Pixels supplied.
        actual: usize,
    },
}

/// Result type for configuration checks.
pub type ConfigResult<T> = Result<T, ConfigError>;

//! # SANDFALL
//!
//! The engine crate, tying the grid simulation to terrain generation.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        SANDFALL ENGINE                        │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  ┌──────────────────────┐        ┌──────────────────────┐     │
//! │  │  sandfall_procedural │        │  sandfall_core       │     │
//! │  │                      │ World  │                      │     │
//! │  │  • NoiseField        │───────>│  • MaterialGrid      │     │
//! │  │  • Stencil           │        │  • FluidRule         │     │
//! │  │  • TerrainGenerator  │        │  • WorkerPool        │     │
//! │  └──────────────────────┘        │  • Simulation        │     │
//! │                                  └──────────┬───────────┘     │
//! │                                             │ PixelSink       │
//! │                                  ┌──────────▼───────────┐     │
//! │                                  │  FrameBuffer         │     │
//! │                                  └──────────────────────┘     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `engine`: Lifecycle facade
//! - `config`: TOML engine settings
//! - `command`: Front-end actions (brushes, regenerate, tick rate)
//! - `pacer`: Fixed-timestep pacing for real-time runs
//! - `textures`: Built-in procedural texture sampler
//! - `framebuffer`: CPU pixel sink

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod framebuffer;
pub mod pacer;
pub mod textures;

// Re-export the units
pub use sandfall_core as core;
pub use sandfall_procedural as procedural;

pub use command::Command;
pub use config::{EngineConfig, MAX_TICKRATE};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use framebuffer::FrameBuffer;
pub use pacer::TickPacer;
pub use textures::{ProceduralTextures, TILE_SIZE};

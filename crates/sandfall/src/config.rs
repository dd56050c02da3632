//! # Engine Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so a file
//! only needs the keys it changes:
//!
//! ```toml
//! threads = 4
//! tickrate = 60
//!
//! [terrain]
//! seed = 42
//! water_density = 80
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sandfall_procedural::TerrainConfig;

use crate::error::{EngineError, EngineResult};

/// Highest accepted tick rate.
pub const MAX_TICKRATE: u32 = 1000;

/// Engine settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads; 0 runs ticks on the caller's thread.
    pub threads: usize,
    /// Simulation ticks per second.
    pub tickrate: u32,
    /// Row bands per tick; 0 picks twice the thread count.
    pub bands: usize,
    /// Terrain generation.
    pub terrain: TerrainConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: 3,
            tickrate: 30,
            bands: 0,
            terrain: TerrainConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or a value is out of
    /// range.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loading engine config");
        Self::from_toml_str(&text)
    }

    /// Writes the config as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> EngineResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks every setting.
    ///
    /// # Errors
    ///
    /// Returns the first setting out of range.
    pub fn validate(&self) -> EngineResult<()> {
        if self.tickrate == 0 || self.tickrate > MAX_TICKRATE {
            return Err(EngineError::Setting {
                field: "tickrate",
                reason: format!("{} is outside 1..={MAX_TICKRATE}", self.tickrate),
            });
        }
        self.terrain.validate()?;
        Ok(())
    }
}

//! Configuration management for zwrap
//!
//! Layered configuration for the `zwrap` tool: built-in defaults, then an
//! optional YAML/TOML/JSON file, then `ZWRAP_*` environment variables.
//! Library crates never read configuration on their own; callers turn a
//! [`Config`] into a [`Backend`] and [`StreamParams`] and pass those to the
//! stream constructors.
//!
//! # Examples
//!
//! ```rust
//! use zwrap_config::{Config, ConfigBuilder};
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_source_file("zwrap.toml")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! let params = config.engine.stream_params().expect("validated at build");
//! println!("Buffer size: {}", config.stream.buffer_size.get());
//! # let _ = params;
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use zwrap_types::{
    Backend, BufferSize, CompressionLevel, MemLevel, Method, Strategy, StreamParams, WindowBits,
};

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Main configuration structure for zwrap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Engine selection and init parameters
    pub engine: EngineConfig,
    /// Streaming configuration
    pub stream: StreamConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Engine selection and init parameters, in legacy numbering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Backend new compression streams use
    pub backend: Backend,
    /// Compression level, `-1` for the engine default
    pub level: i32,
    /// Legacy `windowBits`
    pub window_bits: i8,
    /// Legacy `memLevel`
    pub mem_level: u8,
    /// Legacy matching strategy
    pub strategy: Strategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Legacy,
            level: CompressionLevel::DEFAULT,
            window_bits: WindowBits::DEFAULT,
            mem_level: MemLevel::DEFAULT,
            strategy: Strategy::Default,
        }
    }
}

impl EngineConfig {
    /// Validated stream parameters
    pub fn stream_params(&self) -> ConfigResult<StreamParams> {
        let level = CompressionLevel::new(self.level)
            .map_err(|e| ConfigError::invalid_value("engine.level", e.to_string()))?;
        level
            .resolve(self.backend)
            .map_err(|e| ConfigError::invalid_value("engine.level", e.to_string()))?;

        Ok(StreamParams {
            level,
            method: Method::Deflated,
            window_bits: WindowBits::new(self.window_bits)
                .map_err(|e| ConfigError::invalid_value("engine.window_bits", e.to_string()))?,
            mem_level: MemLevel::new(self.mem_level)
                .map_err(|e| ConfigError::invalid_value("engine.mem_level", e.to_string()))?,
            strategy: self.strategy,
        })
    }
}

/// Streaming configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Chunk size for reads and writes
    pub buffer_size: BufferSize,
    /// Preset dictionary file
    #[serde(default)]
    pub dictionary: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Enable JSON formatting
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json_format: false,
        }
    }
}

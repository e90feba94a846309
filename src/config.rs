//! Configuration for recstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::record::RecordLayout;

/// Default streaming chunk size for payload reads (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Main configuration for a recstore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all table files.
    /// Internal structure:
    ///   {root_dir}/
    ///     ├── {table}.rec      (fixed-width record index)
    ///     └── {table}.data     (metadata + payload spans)
    pub root_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Byte widths of the four RecordInfo fields on disk.
    /// Fixed per table instantiation; encoder and decoder must agree.
    pub layout: RecordLayout,

    // -------------------------------------------------------------------------
    // Read Configuration
    // -------------------------------------------------------------------------
    /// Default window size for chunked payload streaming (bytes)
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./recstore_data"),
            layout: RecordLayout::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the root directory (holds every table's index and data file)
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.root_dir = path.into();
        self
    }

    /// Set the on-disk field widths for index records
    pub fn layout(mut self, layout: RecordLayout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Set the default streaming chunk size (in bytes)
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

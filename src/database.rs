//! Database facade
//!
//! Owns the root directory and an explicit registry of open tables. Each
//! table occupies two files under the root: `{name}.rec` holds the
//! fixed-width record index and `{name}.data` the metadata + payload spans.
//! The registry lives on this handle, not in global state, so its lifetime
//! ends with the database.

use std::any::Any;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::io::RandomAccessFile;
use crate::table::Table;

/// An open record store rooted at one directory
pub struct Database {
    config: Config,

    /// Open tables keyed by name; values are `Arc<Table<M>>` erased to
    /// `Any` so one registry can hold tables of different metadata types
    tables: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Database {
    /// Index file extension (fixed-width RecordInfo sequence)
    const INDEX_EXT: &'static str = "rec";
    /// Data file extension (raw metadata + payload spans)
    const DATA_EXT: &'static str = "data";

    /// Open or create a database with the given config
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.root_dir)?;

        debug!(root = %config.root_dir.display(), "database opened");

        Ok(Self {
            config,
            tables: RwLock::new(HashMap::new()),
        })
    }

    /// Open with a root directory and default config (convenience)
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().root_dir(path).build();
        Self::open(config)
    }

    /// Get or open the table with the given name and metadata type
    ///
    /// The first call per name opens (creating if needed) the table's two
    /// files and caches the instance; later calls return the cached table.
    /// Requesting a cached table under a different metadata type fails with
    /// `TableType`.
    pub fn table<M>(&self, name: &str) -> Result<Arc<Table<M>>>
    where
        M: Serialize + DeserializeOwned + Clone + Send + 'static,
    {
        if let Some(entry) = self.tables.read().get(name) {
            return Self::downcast(name, Arc::clone(entry));
        }

        let mut tables = self.tables.write();

        // Raced open: another caller may have inserted while the read lock
        // was released.
        if let Some(entry) = tables.get(name) {
            return Self::downcast(name, Arc::clone(entry));
        }

        let table = Arc::new(self.open_table::<M>(name)?);
        tables.insert(name.to_string(), table.clone() as Arc<dyn Any + Send + Sync>);

        Ok(table)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of currently open tables
    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn open_table<M>(&self, name: &str) -> Result<Table<M>>
    where
        M: Serialize + DeserializeOwned + Clone + Send + 'static,
    {
        let index_path = self
            .config
            .root_dir
            .join(format!("{}.{}", name, Self::INDEX_EXT));
        let data_path = self
            .config
            .root_dir
            .join(format!("{}.{}", name, Self::DATA_EXT));

        let index = Arc::new(RandomAccessFile::open(&index_path)?);
        let data = Arc::new(RandomAccessFile::open(&data_path)?);

        debug!(name, "table opened");

        Table::new(
            name,
            self.config.layout,
            self.config.chunk_size,
            Arc::clone(&index),
            index,
            Arc::clone(&data),
            data,
        )
    }

    fn downcast<M>(name: &str, entry: Arc<dyn Any + Send + Sync>) -> Result<Arc<Table<M>>>
    where
        M: Serialize + DeserializeOwned + Clone + Send + 'static,
    {
        entry
            .downcast::<Table<M>>()
            .map_err(|_| StoreError::TableType(name.to_string()))
    }
}

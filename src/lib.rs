//! # recstore
//!
//! An embedded, append-oriented record store. A named table maps integer
//! record ids to `(metadata, payload)` pairs persisted across two files:
//! a fixed-width record index and a variable-length data store.
//!
//! - Tombstoned records turn into reusable free space; placement is
//!   best-fit over free spans with append as the fallback
//! - Per-table operations run on a single worker lane, so cache mutation
//!   and file writes never interleave
//! - Payloads are read lazily through placeholders, whole or as a
//!   cancellable chunk stream
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Database                              │
//! │               (registry: name → Table)                       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Table<M>                                │
//! │        (TaskQueue: one operation at a time)                  │
//! └──────────┬──────────────────────────────┬───────────────────┘
//!            │                              │
//!            ▼                              ▼
//!   ┌─────────────────────┐       ┌──────────────────┐
//!   │ RecordsInfoStorage  │       │    DataStore     │
//!   │ (index cache +      │       │ (meta + payload  │
//!   │  best-fit allocator)│       │  spans)          │
//!   └──────────┬──────────┘       └────────┬─────────┘
//!              │                           │
//!              ▼                           ▼
//!         {name}.rec                  {name}.data
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use recstore::{Database, Query};
//!
//! # fn main() -> recstore::Result<()> {
//! let db = Database::open_path("./my_store".as_ref())?;
//! let table = db.table::<u32>("blobs")?;
//!
//! let id = table.insert(*b"payload bytes", 7)?;
//! let placeholder = table.select(id)?;
//! let bytes = placeholder.read_all()?;
//!
//! let rows = table.query(Query::new().filter(|n| *n > 3).order())?;
//! # let _ = (bytes, rows);
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod io;
pub mod record;
pub mod data;
pub mod table;
pub mod database;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::{Config, ConfigBuilder, DEFAULT_CHUNK_SIZE};
pub use database::Database;
pub use data::{ChunkControl, DataPlaceholder, Progress};
pub use record::{FieldWidth, RecordInfo, RecordLayout};
pub use table::{Query, QueryRow, Table};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of recstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

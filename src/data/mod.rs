//! Data Module
//!
//! Byte-level access to the data file: each record owns the region
//! `[offset, offset + meta_size)` for its metadata block and
//! `[offset + meta_size, offset + meta_size + size)` for its payload.
//! Regions of live records never overlap; tombstoned regions are free space
//! handed back to the allocator.

mod placeholder;

pub use placeholder::{ChunkControl, DataPlaceholder, Progress};

use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::io::{SpanReader, SpanWriter};
use crate::record::RecordInfo;

/// Stateless read/write access to one table's data file
///
/// Relies on the table's worker lane for write serialization; it holds no
/// locks of its own.
pub struct DataStore<R, W> {
    reader: Arc<R>,
    writer: Arc<W>,
    chunk_size: usize,
}

impl<R: SpanReader, W: SpanWriter> DataStore<R, W> {
    pub fn new(reader: Arc<R>, writer: Arc<W>, chunk_size: usize) -> Self {
        Self {
            reader,
            writer,
            chunk_size,
        }
    }

    /// Build a lazy payload reference; performs no I/O
    pub fn read(&self, info: &RecordInfo) -> DataPlaceholder<R> {
        DataPlaceholder::new(*info, Arc::clone(&self.reader), self.chunk_size)
    }

    /// Read a record's metadata block
    ///
    /// Returns empty bytes without touching the file when the record has no
    /// metadata.
    pub fn read_meta(&self, info: &RecordInfo) -> Result<Bytes> {
        if info.meta_size == 0 {
            return Ok(Bytes::new());
        }

        self.reader.read(info.offset, info.meta_size as usize)
    }

    /// Write a record's metadata and payload into its declared region
    ///
    /// Buffer lengths must match the record's declared sizes. The metadata
    /// block goes first; the payload write is only issued after it succeeds.
    /// A failure of either write surfaces as-is, with no rollback of bytes
    /// already written.
    pub fn write(&self, info: &RecordInfo, payload: &[u8], meta: &[u8]) -> Result<()> {
        assert_eq!(payload.len() as u64, info.size);
        assert_eq!(meta.len() as u64, info.meta_size);

        if meta.is_empty() {
            return self.writer.write(info.offset, payload);
        }

        self.writer.write(info.offset, meta)?;
        self.writer.write(info.offset + info.meta_size, payload)
    }
}

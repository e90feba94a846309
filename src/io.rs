//! I/O boundary
//!
//! The storage core depends only on the `SpanReader`/`SpanWriter` contract,
//! never on a concrete file type. Two implementations ship with the crate:
//! `RandomAccessFile` for on-disk tables and `MemoryFile` for embedders and
//! tests that want an in-process backend.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::Result;

/// Byte-range reads against a single backing resource
pub trait SpanReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`
    fn read(&self, offset: u64, len: usize) -> Result<Bytes>;

    /// Read the entire resource from the beginning
    fn read_all(&self) -> Result<Bytes>;
}

/// Byte-range writes against a single backing resource
pub trait SpanWriter: Send + Sync {
    /// Write `bytes` starting at `offset`, extending the resource if needed
    fn write(&self, offset: u64, bytes: &[u8]) -> Result<()>;
}

// =============================================================================
// RandomAccessFile
// =============================================================================

/// Positioned file I/O behind a mutex
///
/// The per-table worker lane already serializes index and data mutations;
/// the mutex only protects the seek position from concurrent placeholder
/// reads, which are allowed outside the lane.
pub struct RandomAccessFile {
    file: Mutex<File>,
}

impl RandomAccessFile {
    /// Open a file for reading and writing, creating it if absent
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl SpanReader for RandomAccessFile {
    fn read(&self, offset: u64, len: usize) -> Result<Bytes> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;

        Ok(Bytes::from(buf))
    }

    fn read_all(&self) -> Result<Bytes> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(0))?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        Ok(Bytes::from(buf))
    }
}

impl SpanWriter for RandomAccessFile {
    fn write(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;

        Ok(())
    }
}

// =============================================================================
// MemoryFile
// =============================================================================

/// In-memory backend implementing the same contract
///
/// Reads past the current end report `UnexpectedEof`, matching file behavior.
#[derive(Default)]
pub struct MemoryFile {
    buf: Mutex<Vec<u8>>,
}

impl MemoryFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length of the backing buffer
    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }
}

impl SpanReader for MemoryFile {
    fn read(&self, offset: u64, len: usize) -> Result<Bytes> {
        let buf = self.buf.lock();
        let start = offset as usize;
        let end = start.checked_add(len).filter(|&e| e <= buf.len());

        match end {
            Some(end) => Ok(Bytes::copy_from_slice(&buf[start..end])),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("read of {} bytes at offset {} past end", len, offset),
            )
            .into()),
        }
    }

    fn read_all(&self) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(&self.buf.lock()))
    }
}

impl SpanWriter for MemoryFile {
    fn write(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let mut buf = self.buf.lock();
        let start = offset as usize;
        let end = start + bytes.len();

        if buf.len() < end {
            buf.resize(end, 0);
        }
        buf[start..end].copy_from_slice(bytes);

        Ok(())
    }
}

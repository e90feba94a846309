//! Data placeholder
//!
//! A cheap, non-owning reference to one record's payload bytes. Created on
//! demand from the index entry, never persisted; reads happen only when the
//! caller asks, either whole or as a strictly sequential chunk stream with
//! cooperative cancellation.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::io::SpanReader;
use crate::record::RecordInfo;

/// Progress of a placeholder read
///
/// For whole reads one report is emitted at the start and one at the end.
/// For chunked reads a report follows every chunk; `completed_bytes`
/// accumulates the bytes actually read. `cancelled` is set when the stream
/// ends early, by failure or by the handler's stop signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub total_bytes: u64,
    pub completed_bytes: u64,
    pub cancelled: bool,
}

impl Progress {
    fn started(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            completed_bytes: 0,
            cancelled: false,
        }
    }
}

/// Handler verdict after each delivered chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkControl {
    /// Request the next chunk
    Continue,

    /// Halt after this chunk; no further reads, no terminal marker
    Stop,
}

/// Lazy reference to a record's payload span
///
/// The payload occupies `[offset + meta_size, offset + meta_size + size)` in
/// the data file; the metadata block is not reachable through a placeholder.
pub struct DataPlaceholder<R> {
    record: RecordInfo,
    reader: Arc<R>,
    default_chunk_size: usize,
}

impl<R> DataPlaceholder<R> {
    pub(crate) fn new(record: RecordInfo, reader: Arc<R>, default_chunk_size: usize) -> Self {
        Self {
            record,
            reader,
            default_chunk_size,
        }
    }

    /// Id of the referenced record
    pub fn id(&self) -> u64 {
        self.record.id
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.record.size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.record.size == 0
    }

    /// The table-configured chunk size for streamed reads
    pub fn default_chunk_size(&self) -> usize {
        self.default_chunk_size
    }

    /// The underlying index entry
    pub fn record(&self) -> &RecordInfo {
        &self.record
    }

    fn payload_start(&self) -> u64 {
        self.record.offset + self.record.meta_size
    }
}

impl<R: SpanReader> DataPlaceholder<R> {
    /// Read the whole payload in one operation
    pub fn read_all(&self) -> Result<Bytes> {
        self.reader.read(self.payload_start(), self.len())
    }

    /// Read the whole payload, reporting start and completion
    ///
    /// On failure the final report carries `cancelled` and the error is
    /// returned.
    pub fn read_all_with_progress<P>(&self, mut progress_fn: P) -> Result<Bytes>
    where
        P: FnMut(&Progress),
    {
        let mut progress = Progress::started(self.record.size);
        progress_fn(&progress);

        match self.read_all() {
            Ok(bytes) => {
                progress.completed_bytes = self.record.size;
                progress_fn(&progress);
                Ok(bytes)
            }
            Err(err) => {
                progress.cancelled = true;
                progress_fn(&progress);
                Err(err)
            }
        }
    }

    /// Stream the payload as fixed-size windows, strictly in order
    ///
    /// The handler receives `Some(chunk)` per window and a terminal `None`
    /// once the span is exhausted (immediately, for an empty payload).
    /// Returning `ChunkControl::Stop` halts the stream after the current
    /// chunk with no terminal marker. An I/O failure stops the stream and is
    /// returned; the handler is not invoked again.
    ///
    /// `chunk_size` must be non-zero.
    pub fn read_chunks<F>(&self, chunk_size: usize, mut handler: F) -> Result<()>
    where
        F: FnMut(Option<Bytes>) -> ChunkControl,
    {
        self.stream(chunk_size, |_| {}, &mut handler)
    }

    /// Chunked read with a progress report after every chunk
    pub fn read_chunks_with_progress<P, F>(
        &self,
        chunk_size: usize,
        mut progress_fn: P,
        mut handler: F,
    ) -> Result<()>
    where
        P: FnMut(&Progress),
        F: FnMut(Option<Bytes>) -> ChunkControl,
    {
        self.stream(chunk_size, &mut progress_fn, &mut handler)
    }

    fn stream<P, F>(&self, chunk_size: usize, mut progress_fn: P, handler: &mut F) -> Result<()>
    where
        P: FnMut(&Progress),
        F: FnMut(Option<Bytes>) -> ChunkControl,
    {
        assert!(chunk_size > 0, "chunk_size must be non-zero");

        let start = self.payload_start();
        let end = start + self.record.size;

        let mut progress = Progress::started(self.record.size);
        progress_fn(&progress);

        let mut position = start;
        loop {
            if position >= end {
                handler(None);
                return Ok(());
            }

            let len = (end - position).min(chunk_size as u64) as usize;
            let chunk = match self.reader.read(position, len) {
                Ok(chunk) => chunk,
                Err(err) => {
                    progress.cancelled = true;
                    progress_fn(&progress);
                    return Err(err);
                }
            };

            progress.completed_bytes += len as u64;
            progress_fn(&progress);

            if handler(Some(chunk)) == ChunkControl::Stop {
                progress.cancelled = true;
                progress_fn(&progress);
                return Ok(());
            }

            position += len as u64;
        }
    }
}

// Placeholders are freely clonable references, not data owners.
impl<R> Clone for DataPlaceholder<R> {
    fn clone(&self) -> Self {
        Self {
            record: self.record,
            reader: Arc::clone(&self.reader),
            default_chunk_size: self.default_chunk_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{MemoryFile, SpanWriter};

    fn placeholder(payload: &[u8], meta: &[u8]) -> DataPlaceholder<MemoryFile> {
        let file = Arc::new(MemoryFile::new());
        file.write(0, meta).unwrap();
        file.write(meta.len() as u64, payload).unwrap();

        let record = RecordInfo {
            id: 1,
            offset: 0,
            size: payload.len() as u64,
            meta_size: meta.len() as u64,
            is_deleted: false,
        };

        DataPlaceholder::new(record, file, 4)
    }

    #[test]
    fn read_all_skips_metadata_block() {
        let p = placeholder(b"payload", b"meta");
        assert_eq!(p.read_all().unwrap(), Bytes::from_static(b"payload"));
    }

    #[test]
    fn read_all_with_progress_reports_start_and_completion() {
        let p = placeholder(b"12345", b"");
        let mut reports = Vec::new();

        p.read_all_with_progress(|pr| reports.push(*pr)).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].completed_bytes, 0);
        assert_eq!(reports[1].completed_bytes, 5);
        assert!(!reports[1].cancelled);
    }

    #[test]
    fn chunked_read_partitions_into_windows() {
        let p = placeholder(b"0123456789", b"mm");
        let mut chunks = Vec::new();

        p.read_chunks(4, |chunk| {
            chunks.push(chunk);
            ChunkControl::Continue
        })
        .unwrap();

        assert_eq!(
            chunks,
            vec![
                Some(Bytes::from_static(b"0123")),
                Some(Bytes::from_static(b"4567")),
                Some(Bytes::from_static(b"89")),
                None,
            ]
        );
    }

    #[test]
    fn stop_after_first_chunk_halts_stream() {
        let p = placeholder(b"0123456789", b"");
        let mut calls = 0;

        p.read_chunks(4, |chunk| {
            calls += 1;
            assert!(chunk.is_some());
            ChunkControl::Stop
        })
        .unwrap();

        assert_eq!(calls, 1);
    }

    #[test]
    fn empty_payload_yields_terminal_marker_only() {
        let p = placeholder(b"", b"meta");
        let mut chunks = Vec::new();

        p.read_chunks(4, |chunk| {
            chunks.push(chunk);
            ChunkControl::Continue
        })
        .unwrap();

        assert_eq!(chunks, vec![None]);
    }

    #[test]
    fn chunked_progress_accumulates_bytes_read() {
        let p = placeholder(b"0123456789", b"");
        let mut completed = Vec::new();

        p.read_chunks_with_progress(
            4,
            |pr| completed.push(pr.completed_bytes),
            |_| ChunkControl::Continue,
        )
        .unwrap();

        assert_eq!(completed, vec![0, 4, 8, 10]);
    }

    #[test]
    fn early_stop_marks_progress_cancelled() {
        let p = placeholder(b"0123456789", b"");
        let mut last = None;

        p.read_chunks_with_progress(
            4,
            |pr| last = Some(*pr),
            |_| ChunkControl::Stop,
        )
        .unwrap();

        assert!(last.unwrap().cancelled);
    }

    #[test]
    fn io_failure_surfaces_and_cancels_progress() {
        // record claims more bytes than the backing store holds
        let file = Arc::new(MemoryFile::new());
        file.write(0, b"short").unwrap();

        let record = RecordInfo {
            id: 1,
            offset: 0,
            size: 64,
            meta_size: 0,
            is_deleted: false,
        };
        let p = DataPlaceholder::new(record, file, 4);

        let mut data_calls = 0;
        let mut last = None;
        let result = p.read_chunks_with_progress(
            16,
            |pr| last = Some(*pr),
            |_| {
                data_calls += 1;
                ChunkControl::Continue
            },
        );

        assert!(result.is_err());
        assert_eq!(data_calls, 0);
        assert!(last.unwrap().cancelled);
    }
}

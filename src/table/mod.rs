//! Table Module
//!
//! The per-table composition root: record index storage, data store,
//! decoded-metadata cache, and the single-lane task queue.
//!
//! ## Concurrency Model
//! Every public operation is one queued task. The worker lane owns all
//! mutable state, so index-cache mutation and the matching file writes are
//! serialized in submission order without any locking. Placeholder payload
//! reads returned by `select`/`query` happen outside the lane by design;
//! they only touch immutable record descriptors and the shared reader.
//!
//! ## Failure Model
//! Multi-step operations are linear chains: the first failing stage aborts
//! the rest and surfaces verbatim. There is no rollback — a data-region
//! write that succeeded before an index write failed leaves orphaned but
//! harmless bytes, never a corrupted index.

mod query;
mod queue;

pub use query::{Comparator, Predicate, Query, QueryRow};
pub use queue::{Task, TaskContext, TaskQueue};

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam::channel::bounded;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::data::{DataPlaceholder, DataStore};
use crate::error::{Result, StoreError};
use crate::io::{RandomAccessFile, SpanReader, SpanWriter};
use crate::record::{RecordInfo, RecordLayout, RecordsInfoStorage};

use query::{paginate, QueryKind};

/// A named table mapping record ids to `(metadata, payload)` pairs
///
/// `M` is the metadata type, carried through the external codec boundary
/// (serde + bincode). Payloads are raw bytes, read lazily via placeholders.
pub struct Table<M, R = RandomAccessFile, W = RandomAccessFile> {
    queue: TaskQueue<TableInner<M, R, W>>,
}

impl<M, R, W> std::fmt::Debug for Table<M, R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").finish_non_exhaustive()
    }
}

/// Lane-owned state: the caches and both file surfaces
struct TableInner<M, R, W> {
    records: RecordsInfoStorage<R, W>,
    data: DataStore<R, W>,
    meta_cache: HashMap<u64, M>,
}

impl<M, R, W> Table<M, R, W>
where
    M: Serialize + DeserializeOwned + Clone + Send + 'static,
    R: SpanReader + 'static,
    W: SpanWriter + 'static,
{
    /// Open a table over its two backing resources
    ///
    /// `index_*` address the fixed-width record index, `data_*` the
    /// metadata + payload spans. `layout` must match what the index file
    /// was written with.
    pub fn new(
        name: &str,
        layout: RecordLayout,
        chunk_size: usize,
        index_reader: Arc<R>,
        index_writer: Arc<W>,
        data_reader: Arc<R>,
        data_writer: Arc<W>,
    ) -> Result<Self> {
        let inner = TableInner {
            records: RecordsInfoStorage::new(layout, index_reader, index_writer),
            data: DataStore::new(data_reader, data_writer, chunk_size),
            meta_cache: HashMap::new(),
        };

        Ok(Self {
            queue: TaskQueue::new(name, inner)?,
        })
    }

    // =========================================================================
    // Operations (each one queued task)
    // =========================================================================

    /// Insert a payload with its metadata, returning the assigned id
    ///
    /// Stages: encode metadata → plan placement → persist the reclaimed
    /// tombstone (when a free span was taken) → write data bytes → append
    /// the index entry → cache the decoded metadata.
    pub fn insert(&self, payload: impl Into<Vec<u8>>, meta: M) -> Result<u64> {
        let meta_bytes =
            bincode::serialize(&meta).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let payload = payload.into();

        self.run(move |inner| inner.insert(payload, meta_bytes, meta))
    }

    /// Resolve an id to a lazy payload reference
    ///
    /// Fails with `NotFound` when the id was never assigned.
    pub fn select(&self, id: u64) -> Result<DataPlaceholder<R>> {
        self.run(move |inner| inner.select(id))
    }

    /// Tombstone a record and evict its cached metadata
    ///
    /// Deleting an absent id is a no-op success.
    pub fn delete(&self, id: u64) -> Result<()> {
        self.run(move |inner| inner.delete(id))
    }

    /// Tombstone a batch of ids under one queued operation
    ///
    /// Absent ids are skipped; the first failure aborts the remainder,
    /// leaving earlier tombstones applied.
    pub fn delete_many(&self, ids: Vec<u64>) -> Result<()> {
        self.run(move |inner| inner.delete_many(&ids))
    }

    /// Decode a record's metadata, via the cache when possible
    ///
    /// A decode failure surfaces as `Decode` and is not cached.
    pub fn read_meta(&self, id: u64) -> Result<M> {
        self.run(move |inner| inner.read_meta(id))
    }

    /// Execute a query over the table's visible records
    pub fn query(&self, query: Query<M>) -> Result<Vec<QueryRow<M, R>>> {
        self.run(move |inner| inner.query(query))
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Snapshot of the full record index, tombstones included
    pub fn records(&self) -> Result<Vec<RecordInfo>> {
        self.run(|inner| Ok(inner.records.select_all()?.to_vec()))
    }

    /// Number of visible (non-deleted) records
    pub fn visible_count(&self) -> Result<usize> {
        self.run(|inner| {
            Ok(inner
                .records
                .select_all()?
                .iter()
                .filter(|r| !r.is_deleted)
                .count())
        })
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Queue an operation and block on its result
    fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut TableInner<M, R, W>) -> Result<T> + Send + 'static,
    {
        let (tx, rx) = bounded(1);

        self.queue.submit(Box::new(move |inner, ctx| {
            let result = op(inner);
            let _ = tx.send(result);
            ctx.finish();
        }))?;

        rx.recv()
            .map_err(|_| StoreError::Queue("worker exited".into()))?
    }
}

impl<M, R, W> TableInner<M, R, W>
where
    M: Serialize + DeserializeOwned + Clone + Send + 'static,
    R: SpanReader + 'static,
    W: SpanWriter + 'static,
{
    fn insert(&mut self, payload: Vec<u8>, meta_bytes: Vec<u8>, meta: M) -> Result<u64> {
        let placement = self
            .records
            .new_record(payload.len() as u64, meta_bytes.len() as u64)?;

        // The shrunk tombstone must be durable before its span is handed
        // over, otherwise a failed data write could leave it double-counted.
        if let Some(reclaimed) = placement.reclaimed {
            self.records.update(reclaimed)?;
        }

        self.data.write(&placement.new, &payload, &meta_bytes)?;
        self.records.insert(placement.new)?;
        self.meta_cache.insert(placement.new.id, meta);

        debug!(
            id = placement.new.id,
            offset = placement.new.offset,
            size = placement.new.size,
            meta_size = placement.new.meta_size,
            "record inserted"
        );

        Ok(placement.new.id)
    }

    fn select(&mut self, id: u64) -> Result<DataPlaceholder<R>> {
        let info = self.records.select(id)?.ok_or(StoreError::NotFound(id))?;
        Ok(self.data.read(&info))
    }

    fn delete(&mut self, id: u64) -> Result<()> {
        self.records.delete(id)?;
        self.meta_cache.remove(&id);

        debug!(id, "record deleted");
        Ok(())
    }

    fn delete_many(&mut self, ids: &[u64]) -> Result<()> {
        for &id in ids {
            self.delete(id)?;
        }
        Ok(())
    }

    fn read_meta(&mut self, id: u64) -> Result<M> {
        let info = self.records.select(id)?.ok_or(StoreError::NotFound(id))?;
        self.meta_for(&info)
    }

    /// Cache-first metadata decode for one index entry
    fn meta_for(&mut self, info: &RecordInfo) -> Result<M> {
        if let Some(meta) = self.meta_cache.get(&info.id) {
            return Ok(meta.clone());
        }

        let bytes = self.data.read_meta(info)?;
        let meta: M =
            bincode::deserialize(&bytes).map_err(|e| StoreError::Decode(e.to_string()))?;

        self.meta_cache.insert(info.id, meta.clone());
        Ok(meta)
    }

    /// Decode metadata for a run of index entries, first failure aborts
    fn metas_for(&mut self, infos: &[RecordInfo]) -> Result<Vec<M>> {
        infos.iter().map(|info| self.meta_for(info)).collect()
    }

    fn query(&mut self, query: Query<M>) -> Result<Vec<QueryRow<M, R>>> {
        // Tombstones are never visible to queries.
        let visible: Vec<RecordInfo> = self
            .records
            .select_all()?
            .iter()
            .filter(|r| !r.is_deleted)
            .copied()
            .collect();

        let skip = query.skip.unwrap_or(0);
        let limit = query.limit;

        let window = match query.kind {
            // Plain: slice first, decode metadata only for the window.
            QueryKind::Plain => {
                let window = paginate(visible, skip, limit);
                let metas = self.metas_for(&window)?;
                window.into_iter().zip(metas).collect()
            }

            // Filtered: decode for every visible record, filter, then slice.
            QueryKind::Filtered(predicate) => {
                let pairs = self.visible_pairs(visible)?;
                let filtered: Vec<_> = pairs
                    .into_iter()
                    .filter(|(_, meta)| predicate(meta))
                    .collect();
                paginate(filtered, skip, limit)
            }

            // Ordered: filter, stable sort, then slice.
            QueryKind::FilteredOrdered { filter, order } => {
                let pairs = self.visible_pairs(visible)?;
                let mut filtered: Vec<_> = match filter {
                    Some(predicate) => pairs
                        .into_iter()
                        .filter(|(_, meta)| predicate(meta))
                        .collect(),
                    None => pairs,
                };
                filtered.sort_by(|a, b| order(&a.1, &b.1));
                paginate(filtered, skip, limit)
            }
        };

        Ok(window
            .into_iter()
            .map(|(info, meta)| QueryRow {
                meta,
                data: self.data.read(&info),
            })
            .collect())
    }

    fn visible_pairs(&mut self, visible: Vec<RecordInfo>) -> Result<Vec<(RecordInfo, M)>> {
        let metas = self.metas_for(&visible)?;
        Ok(visible.into_iter().zip(metas).collect())
    }
}

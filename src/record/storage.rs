//! Records info storage
//!
//! Owns the in-memory cache of a table's index and the free-space allocator.
//!
//! ## Cache Lifecycle
//! The cache starts unloaded and hydrates from the index file on the first
//! operation. After that every operation acts on the cache and persists its
//! delta to the file without re-reading it; the cache is invalidated only by
//! process restart.
//!
//! ## Concurrency
//! No internal locking. All mutation is expected to happen on the owning
//! table's worker lane; using this type from two threads at once is a
//! contract violation.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Result, StoreError};
use crate::io::{SpanReader, SpanWriter};

use super::{RecordCodec, RecordInfo, RecordLayout};

/// Placement plan returned by the allocator
///
/// `new_record` never mutates the index itself: the caller persists
/// `reclaimed` (when present) via `update`, then inserts `new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// The record to insert, with offset/size/meta_size fixed
    pub new: RecordInfo,

    /// Rewrite of the tombstone whose span was taken, shrunk to the leftover
    /// span (possibly zero). `None` when the record was placed by appending.
    pub reclaimed: Option<RecordInfo>,
}

/// Cached record index over one index file
pub struct RecordsInfoStorage<R, W> {
    reader: Arc<R>,
    writer: Arc<W>,
    codec: RecordCodec,
    cached: Vec<RecordInfo>,
    loaded: bool,
}

impl<R: SpanReader, W: SpanWriter> RecordsInfoStorage<R, W> {
    pub fn new(layout: RecordLayout, reader: Arc<R>, writer: Arc<W>) -> Self {
        Self {
            reader,
            writer,
            codec: RecordCodec::new(layout),
            cached: Vec::new(),
            loaded: false,
        }
    }

    /// All records, tombstones included, hydrating from disk on first call
    pub fn select_all(&mut self) -> Result<&[RecordInfo]> {
        self.ensure_loaded()?;
        Ok(&self.cached)
    }

    /// Find a record by id (linear scan, tombstones included)
    pub fn select(&mut self, id: u64) -> Result<Option<RecordInfo>> {
        self.ensure_loaded()?;
        Ok(self.cached.iter().find(|info| info.id == id).copied())
    }

    /// Append a new record to the index
    ///
    /// Fails with `DuplicateId` if the id is already present. The encoded
    /// record is written at `position * record_width` where position is the
    /// current record count (tombstones included).
    pub fn insert(&mut self, info: RecordInfo) -> Result<()> {
        self.ensure_loaded()?;

        if self.cached.iter().any(|r| r.id == info.id) {
            return Err(StoreError::DuplicateId(info.id));
        }

        let position = self.cached.len();
        self.write_slot(position, &info)?;
        self.cached.push(info);

        trace!(id = info.id, position, "index record inserted");
        Ok(())
    }

    /// Overwrite the record with the same id in place
    ///
    /// Fails with `NotFound` if the id is absent. Succeeds without I/O when
    /// the new value equals the cached one.
    pub fn update(&mut self, info: RecordInfo) -> Result<()> {
        self.ensure_loaded()?;

        let position = self
            .position_of(info.id)
            .ok_or(StoreError::NotFound(info.id))?;

        if self.cached[position] == info {
            return Ok(());
        }

        self.write_slot(position, &info)?;
        self.cached[position] = info;

        Ok(())
    }

    /// Insert or update depending on whether the id is already present
    pub fn insert_or_update(&mut self, info: RecordInfo) -> Result<()> {
        self.ensure_loaded()?;

        if self.position_of(info.id).is_some() {
            self.update(info)
        } else {
            self.insert(info)
        }
    }

    /// Overwrite the slot currently holding `source_id` with `info`
    ///
    /// A no-op success when the source id is absent; this tolerates races
    /// where the target was already removed.
    pub fn replace(&mut self, source_id: u64, info: RecordInfo) -> Result<()> {
        self.ensure_loaded()?;

        let Some(position) = self.position_of(source_id) else {
            return Ok(());
        };

        self.write_slot(position, &info)?;
        self.cached[position] = info;

        Ok(())
    }

    /// Tombstone a record in place, merging its spans into free space
    ///
    /// A no-op success when the id is absent.
    pub fn delete(&mut self, id: u64) -> Result<()> {
        self.ensure_loaded()?;

        let Some(position) = self.position_of(id) else {
            return Ok(());
        };

        let dead = self.cached[position].tombstone();
        self.write_slot(position, &dead)?;
        self.cached[position] = dead;

        trace!(id, span = dead.size, "record tombstoned");
        Ok(())
    }

    /// Tombstone each id in turn; absent ids are skipped
    ///
    /// The first write failure aborts the remainder; already-applied
    /// tombstones stay in place.
    pub fn delete_many(&mut self, ids: &[u64]) -> Result<()> {
        for &id in ids {
            self.delete(id)?;
        }
        Ok(())
    }

    /// Plan placement for a record of `size` payload and `meta_size`
    /// metadata bytes
    ///
    /// Best-fit over tombstoned spans: among tombstones whose total span
    /// covers the request, the smallest wins (ties by encounter order) and
    /// its leftover becomes a shrunk tombstone behind the new record. With
    /// no fitting tombstone the record appends past the highest occupied
    /// byte. The new id is one past the highest id ever assigned.
    pub fn new_record(&mut self, size: u64, meta_size: u64) -> Result<Placement> {
        self.ensure_loaded()?;

        let id = self.cached.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let required = size + meta_size;

        // Best fit, ties broken by encounter order: only a strictly smaller
        // span displaces the current candidate.
        let mut best: Option<RecordInfo> = None;
        for record in self.cached.iter().filter(|r| r.is_deleted && r.span() >= required) {
            if best.map_or(true, |b| record.span() < b.span()) {
                best = Some(*record);
            }
        }

        if let Some(dest) = best {
            let new = RecordInfo {
                id,
                offset: dest.offset,
                size,
                meta_size,
                is_deleted: false,
            };
            let reclaimed = RecordInfo {
                id: dest.id,
                offset: dest.offset + required,
                size: dest.span() - required,
                meta_size: 0,
                is_deleted: true,
            };

            debug!(
                id,
                offset = new.offset,
                required,
                leftover = reclaimed.size,
                "allocated from tombstone"
            );

            return Ok(Placement {
                new,
                reclaimed: Some(reclaimed),
            });
        }

        let offset = self.cached.iter().map(|r| r.end()).max().unwrap_or(0);
        let new = RecordInfo {
            id,
            offset,
            size,
            meta_size,
            is_deleted: false,
        };

        debug!(id, offset, required, "allocated by append");

        Ok(Placement {
            new,
            reclaimed: None,
        })
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn ensure_loaded(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }

        let bytes = self.reader.read_all()?;
        self.cached = self.codec.decode_all(&bytes);
        self.loaded = true;

        debug!(records = self.cached.len(), "index hydrated from disk");
        Ok(())
    }

    fn position_of(&self, id: u64) -> Option<usize> {
        self.cached.iter().position(|info| info.id == id)
    }

    fn write_slot(&self, position: usize, info: &RecordInfo) -> Result<()> {
        let offset = (position * self.codec.record_width()) as u64;
        self.writer.write(offset, &self.codec.encode(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryFile;

    fn storage() -> RecordsInfoStorage<MemoryFile, MemoryFile> {
        let file = Arc::new(MemoryFile::new());
        RecordsInfoStorage::new(RecordLayout::default(), file.clone(), file)
    }

    fn live(id: u64, offset: u64, size: u64, meta_size: u64) -> RecordInfo {
        RecordInfo {
            id,
            offset,
            size,
            meta_size,
            is_deleted: false,
        }
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let mut storage = storage();
        storage.insert(live(1, 0, 4, 0)).unwrap();

        let err = storage.insert(live(1, 8, 2, 0)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(1)));
    }

    #[test]
    fn update_missing_id_fails() {
        let mut storage = storage();
        let err = storage.update(live(9, 0, 1, 0)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(9)));
    }

    #[test]
    fn replace_missing_source_is_noop() {
        let mut storage = storage();
        storage.replace(9, live(1, 0, 1, 0)).unwrap();
        assert!(storage.select_all().unwrap().is_empty());
    }

    #[test]
    fn persisted_records_survive_rehydration() {
        let file = Arc::new(MemoryFile::new());
        let a = live(1, 0, 10, 2);
        let b = live(2, 12, 5, 0);

        {
            let mut storage =
                RecordsInfoStorage::new(RecordLayout::default(), file.clone(), file.clone());
            storage.insert(a).unwrap();
            storage.insert(b).unwrap();
            storage.delete(2).unwrap();
        }

        let mut reopened = RecordsInfoStorage::new(RecordLayout::default(), file.clone(), file);
        let records = reopened.select_all().unwrap();

        assert_eq!(records[0], a);
        assert_eq!(records[1], b.tombstone());
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut storage = storage();

        for _ in 0..3 {
            let placement = storage.new_record(4, 0).unwrap();
            storage.insert(placement.new).unwrap();
        }
        storage.delete(2).unwrap();
        storage.delete(3).unwrap();

        let placement = storage.new_record(1, 0).unwrap();
        assert_eq!(placement.new.id, 4);
    }

    #[test]
    fn best_fit_prefers_smallest_covering_tombstone() {
        let mut storage = storage();
        storage.insert(live(1, 0, 40, 0)).unwrap();
        storage.insert(live(2, 40, 10, 0)).unwrap();
        storage.insert(live(3, 50, 20, 0)).unwrap();
        storage.delete(1).unwrap();
        storage.delete(3).unwrap();

        // spans 40 and 20 are free; a request of 15 should take the 20
        let placement = storage.new_record(15, 0).unwrap();
        assert_eq!(placement.new.offset, 50);

        let leftover = placement.reclaimed.unwrap();
        assert_eq!(leftover.offset, 65);
        assert_eq!(leftover.size, 5);
        assert_eq!(leftover.meta_size, 0);
        assert!(leftover.is_deleted);
    }

    #[test]
    fn best_fit_ties_break_by_encounter_order() {
        let mut storage = storage();
        storage.insert(live(1, 0, 20, 0)).unwrap();
        storage.insert(live(2, 20, 20, 0)).unwrap();
        storage.delete(1).unwrap();
        storage.delete(2).unwrap();

        // both free spans are 20; the earlier slot wins
        let placement = storage.new_record(10, 0).unwrap();
        assert_eq!(placement.new.offset, 0);
        assert_eq!(placement.reclaimed.unwrap().id, 1);
    }

    #[test]
    fn exact_fit_leaves_zero_span_tombstone() {
        let mut storage = storage();
        storage.insert(live(1, 0, 8, 4)).unwrap();
        storage.delete(1).unwrap();

        let placement = storage.new_record(10, 2).unwrap();
        assert_eq!(placement.new.offset, 0);

        let leftover = placement.reclaimed.unwrap();
        assert_eq!(leftover.size, 0);
        assert_eq!(leftover.offset, 12);
    }

    #[test]
    fn append_fallback_uses_highest_end() {
        let mut storage = storage();
        storage.insert(live(1, 0, 10, 0)).unwrap();
        storage.insert(live(2, 10, 20, 5)).unwrap();
        storage.delete(1).unwrap();

        // free span of 10 cannot hold 16 bytes
        let placement = storage.new_record(16, 0).unwrap();
        assert_eq!(placement.new.offset, 35);
        assert!(placement.reclaimed.is_none());
    }

    #[test]
    fn empty_index_allocates_id_one_at_offset_zero() {
        let mut storage = storage();
        let placement = storage.new_record(2, 5).unwrap();

        assert_eq!(placement.new.id, 1);
        assert_eq!(placement.new.offset, 0);
        assert!(placement.reclaimed.is_none());
    }

    #[test]
    fn update_equal_value_skips_io() {
        let file = Arc::new(MemoryFile::new());
        let mut storage =
            RecordsInfoStorage::new(RecordLayout::default(), file.clone(), file.clone());

        let info = live(1, 0, 4, 0);
        storage.insert(info).unwrap();
        let before = file.len();

        storage.update(info).unwrap();
        assert_eq!(file.len(), before);
    }

    #[test]
    fn delete_many_skips_absent_ids() {
        let mut storage = storage();
        storage.insert(live(1, 0, 4, 0)).unwrap();
        storage.insert(live(2, 4, 4, 0)).unwrap();

        storage.delete_many(&[2, 99, 1]).unwrap();

        let records = storage.select_all().unwrap();
        assert!(records.iter().all(|r| r.is_deleted));
    }

    #[test]
    fn tombstone_slot_is_rewritten_in_place() {
        let mut storage = storage();
        storage.insert(live(1, 0, 6, 2)).unwrap();
        storage.insert(live(2, 8, 3, 0)).unwrap();
        storage.delete(1).unwrap();

        let records = storage.select_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].size, 8);
        assert_eq!(records[0].meta_size, 0);
        assert!(records[0].is_deleted);
    }
}

//! Record Module
//!
//! The fixed-width record index: descriptor type, on-disk layout
//! configuration, binary codec, and the cached index storage with its
//! best-fit free-space allocator.
//!
//! ## Index File Format
//! ```text
//! ┌───────────────┬───────────────┬───────────────┬─────┐
//! │ RecordInfo #0 │ RecordInfo #1 │ RecordInfo #2 │ ... │
//! └───────────────┴───────────────┴───────────────┴─────┘
//! ```
//! Every record occupies `RecordLayout::record_width()` bytes; a record's
//! position in the file never changes, slots are only overwritten in place
//! (tombstoned or resized) or appended.

mod codec;
mod storage;

pub use codec::RecordCodec;
pub use storage::{Placement, RecordsInfoStorage};

/// In-memory descriptor locating one record's metadata + payload span
///
/// The on-disk encoding packs `is_deleted` into the least-significant bit of
/// the stored id, so a logical id must fit in one bit less than the
/// configured id width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordInfo {
    /// Monotonically assigned, never reused even after deletion
    pub id: u64,

    /// Byte offset of this record's region in the data file
    pub offset: u64,

    /// Payload byte length
    pub size: u64,

    /// Metadata byte length (0 means no metadata block)
    pub meta_size: u64,

    /// Tombstone flag; a deleted record's span is reusable free space
    pub is_deleted: bool,
}

impl RecordInfo {
    /// Total bytes occupied in the data file (metadata + payload)
    pub fn span(&self) -> u64 {
        self.size + self.meta_size
    }

    /// First byte past this record's region in the data file
    pub fn end(&self) -> u64 {
        self.offset + self.span()
    }

    /// The tombstone that replaces this record on delete: the metadata and
    /// payload spans merge into one free span at the same offset.
    pub(crate) fn tombstone(&self) -> RecordInfo {
        RecordInfo {
            id: self.id,
            offset: self.offset,
            size: self.span(),
            meta_size: 0,
            is_deleted: true,
        }
    }
}

/// Byte width of one stored integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    U8,
    U16,
    U32,
    U64,
}

impl FieldWidth {
    /// Width in bytes
    pub const fn bytes(self) -> usize {
        match self {
            FieldWidth::U8 => 1,
            FieldWidth::U16 => 2,
            FieldWidth::U32 => 4,
            FieldWidth::U64 => 8,
        }
    }

    /// Largest value the field can store
    pub const fn max_value(self) -> u64 {
        match self {
            FieldWidth::U8 => u8::MAX as u64,
            FieldWidth::U16 => u16::MAX as u64,
            FieldWidth::U32 => u32::MAX as u64,
            FieldWidth::U64 => u64::MAX,
        }
    }
}

/// On-disk field widths for one table's index records
///
/// Computed once at table-open time; the codec and allocator operate over
/// this configuration rather than compile-time integer generics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub id: FieldWidth,
    pub offset: FieldWidth,
    pub size: FieldWidth,
    pub meta_size: FieldWidth,
}

impl RecordLayout {
    /// Total width of one encoded record (sum of the four field widths)
    pub const fn record_width(&self) -> usize {
        self.id.bytes() + self.offset.bytes() + self.size.bytes() + self.meta_size.bytes()
    }
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self {
            id: FieldWidth::U32,
            offset: FieldWidth::U64,
            size: FieldWidth::U32,
            meta_size: FieldWidth::U32,
        }
    }
}

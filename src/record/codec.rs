//! Record codec
//!
//! Fixed-width binary encoding for `RecordInfo`.
//!
//! ## Wire Format (per record, widths from `RecordLayout`)
//! ```text
//! ┌──────────────────┬──────────┬──────────┬────────────┐
//! │ id << 1 | deleted│  offset  │   size   │  meta_size │
//! └──────────────────┴──────────┴──────────┴────────────┘
//! ```
//! All fields are little-endian unsigned integers truncated to their
//! configured width. The tombstone flag is packed into the least-significant
//! bit of the stored id; decoding shifts it back out.

use super::{FieldWidth, RecordInfo, RecordLayout};

/// Stateless encoder/decoder for one table's index records
#[derive(Debug, Clone, Copy)]
pub struct RecordCodec {
    layout: RecordLayout,
}

impl RecordCodec {
    pub fn new(layout: RecordLayout) -> Self {
        Self { layout }
    }

    /// Width in bytes of one encoded record
    pub fn record_width(&self) -> usize {
        self.layout.record_width()
    }

    /// Encode a record into `record_width()` bytes
    ///
    /// A field value exceeding its configured width (for the id: one bit
    /// less, since the low bit is stolen) is a caller contract violation.
    pub fn encode(&self, info: &RecordInfo) -> Vec<u8> {
        debug_assert!(info.id <= self.layout.id.max_value() >> 1);
        debug_assert!(info.offset <= self.layout.offset.max_value());
        debug_assert!(info.size <= self.layout.size.max_value());
        debug_assert!(info.meta_size <= self.layout.meta_size.max_value());

        let stored_id = (info.id << 1) | u64::from(info.is_deleted);

        let mut buf = Vec::with_capacity(self.record_width());
        put_uint(&mut buf, stored_id, self.layout.id);
        put_uint(&mut buf, info.offset, self.layout.offset);
        put_uint(&mut buf, info.size, self.layout.size);
        put_uint(&mut buf, info.meta_size, self.layout.meta_size);

        buf
    }

    /// Decode every complete record in the buffer
    ///
    /// A partial trailing chunk smaller than `record_width()` is a truncated
    /// or corrupt tail and is ignored.
    pub fn decode_all(&self, bytes: &[u8]) -> Vec<RecordInfo> {
        bytes
            .chunks_exact(self.record_width())
            .map(|chunk| self.decode_one(chunk))
            .collect()
    }

    fn decode_one(&self, chunk: &[u8]) -> RecordInfo {
        let mut cursor = 0usize;
        let stored_id = take_uint(chunk, &mut cursor, self.layout.id);
        let offset = take_uint(chunk, &mut cursor, self.layout.offset);
        let size = take_uint(chunk, &mut cursor, self.layout.size);
        let meta_size = take_uint(chunk, &mut cursor, self.layout.meta_size);

        RecordInfo {
            id: stored_id >> 1,
            offset,
            size,
            meta_size,
            is_deleted: (stored_id & 1) != 0,
        }
    }
}

/// Append `value` as a little-endian integer of the given width
fn put_uint(buf: &mut Vec<u8>, value: u64, width: FieldWidth) {
    buf.extend_from_slice(&value.to_le_bytes()[..width.bytes()]);
}

/// Read a little-endian integer of the given width, advancing the cursor
fn take_uint(chunk: &[u8], cursor: &mut usize, width: FieldWidth) -> u64 {
    let mut raw = [0u8; 8];
    let bytes = width.bytes();
    raw[..bytes].copy_from_slice(&chunk[*cursor..*cursor + bytes]);
    *cursor += bytes;

    u64::from_le_bytes(raw)
}

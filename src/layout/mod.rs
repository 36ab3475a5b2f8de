//! Binary Layout Module
//!
//! Fixed-width on-disk formats shared by the sequence store and the shard store.
//!
//! ## Responsibilities
//! - Byte size of the file header and of each record kind
//! - Offset arithmetic for record slots and their status byte
//! - One byte order for every integer: big-endian
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Header (16 bytes)                            │
//! │ ┌──────────────────────┬───────────────────┐ │
//! │ │ TotalRecords u64 (8) │ LastUpdated u64(8)│ │
//! │ └──────────────────────┴───────────────────┘ │
//! ├──────────────────────────────────────────────┤
//! │ Record 1 (R::LEN bytes)                      │
//! │ Record 2                                     │
//! │ ... (TotalRecords slots, no trailer)         │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! No field is length-prefixed; tokens are zero-padded to their fixed width.
//! Files produced with another byte order are not reinterpreted.

mod header;
mod record;

pub use header::{Header, HEADER_LEN};
pub use record::{ContentHash, FixedRecord, HashRecord, SequenceRecord, Status, HASH_LEN};

/// Byte offset of record `index` (1-based). `None` for index 0 or overflow.
pub fn record_offset<R: FixedRecord>(index: u64) -> Option<u64> {
    let slot = index.checked_sub(1)?;
    slot.checked_mul(R::LEN as u64)?.checked_add(HEADER_LEN as u64)
}

/// Byte offset of the status byte inside record `index` (1-based)
pub fn status_offset<R: FixedRecord>(index: u64) -> Option<u64> {
    record_offset::<R>(index)?.checked_add(R::STATUS_OFFSET as u64)
}

/// Minimum file length that holds a header plus `total` records
pub fn required_len<R: FixedRecord>(total: u64) -> Option<u64> {
    total
        .checked_mul(R::LEN as u64)?
        .checked_add(HEADER_LEN as u64)
}

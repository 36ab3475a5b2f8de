//! File header
//!
//! Sixteen bytes at offset 0 of every data and shard file.

use bytes::{Buf, BufMut, BytesMut};

/// Header size: TotalRecords (8) + LastUpdated (8) = 16 bytes
pub const HEADER_LEN: usize = 16;

/// Per-file metadata block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    /// Number of record slots after the header
    pub total_records: u64,

    /// Watermark: 1-based index of the record most recently confirmed
    /// through a header-refreshing update (0 = never)
    pub last_updated: u64,
}

impl Header {
    pub fn new(total_records: u64, last_updated: u64) -> Self {
        Self {
            total_records,
            last_updated,
        }
    }

    /// Serialize to the on-disk form
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = BytesMut::with_capacity(HEADER_LEN);
        buf.put_u64(self.total_records);
        buf.put_u64(self.last_updated);

        let mut out = [0u8; HEADER_LEN];
        out.copy_from_slice(&buf);
        out
    }

    /// Parse from the first `HEADER_LEN` bytes of `buf`
    ///
    /// Returns `None` when fewer than `HEADER_LEN` bytes are available.
    pub fn decode(mut buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_LEN {
            return None;
        }
        Some(Self {
            total_records: buf.get_u64(),
            last_updated: buf.get_u64(),
        })
    }
}

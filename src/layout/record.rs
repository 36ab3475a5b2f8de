//! Record layouts
//!
//! ```text
//! SequenceRecord (45 bytes)
//! ┌──────────────┬────────────┬──────────────────┐
//! │ Sequence (8) │ Status (1) │ Token (36)       │
//! └──────────────┴────────────┴──────────────────┘
//!
//! HashRecord (61 bytes)
//! ┌───────────┬───────────┬──────────────┬────────────┬────────────┐
//! │ Hash (16) │ Count (4) │ LastOcc (4)  │ Status (1) │ Token (36) │
//! └───────────┴───────────┴──────────────┴────────────┴────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::token::{Token, TOKEN_LEN};

/// Content hash width in bytes
pub const HASH_LEN: usize = 16;

// =============================================================================
// Status
// =============================================================================

/// Per-record status byte
///
/// Only 0 and 1 carry meaning; any other byte read from disk is kept as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Status(pub u8);

impl Status {
    pub const PENDING: Status = Status(0);
    pub const CONFIRMED: Status = Status(1);

    pub fn is_confirmed(self) -> bool {
        self == Status::CONFIRMED
    }

    pub fn as_byte(self) -> u8 {
        self.0
    }
}

impl From<u8> for Status {
    fn from(byte: u8) -> Self {
        Status(byte)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Status::PENDING => write!(f, "pending"),
            Status::CONFIRMED => write!(f, "confirmed"),
            Status(other) => write!(f, "status({})", other),
        }
    }
}

// =============================================================================
// Content Hash
// =============================================================================

/// 16-byte content hash used as the shard store's lookup key
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub [u8; HASH_LEN]);

impl ContentHash {
    /// Parse 32 hex digits
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let mut out = [0u8; HASH_LEN];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl From<[u8; HASH_LEN]> for ContentHash {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl FromStr for ContentHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

// =============================================================================
// Fixed Record Trait
// =============================================================================

/// A record kind with a fixed on-disk width
pub trait FixedRecord: Sized {
    /// Encoded width in bytes
    const LEN: usize;

    /// Offset of the status byte within the record
    const STATUS_OFFSET: usize;

    /// Append exactly `LEN` bytes to `buf`
    fn encode_into(&self, buf: &mut BytesMut);

    /// Parse from the first `LEN` bytes; `None` if `buf` is shorter
    fn decode(buf: &[u8]) -> Option<Self>;

    fn status(&self) -> Status;

    fn token(&self) -> &Token;

    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::LEN);
        self.encode_into(&mut buf);
        buf.freeze()
    }
}

fn get_token(buf: &mut &[u8]) -> Token {
    let mut raw = [0u8; TOKEN_LEN];
    buf.copy_to_slice(&mut raw);
    Token::from_bytes(raw)
}

// =============================================================================
// Sequence Record
// =============================================================================

/// Record of the sequence store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceRecord {
    /// 1-based sequence number, equal to the slot index
    pub sequence: u64,
    pub status: Status,
    pub token: Token,
}

impl FixedRecord for SequenceRecord {
    /// Sequence (8) + Status (1) + Token (36)
    const LEN: usize = 8 + 1 + TOKEN_LEN;
    const STATUS_OFFSET: usize = 8;

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u64(self.sequence);
        buf.put_u8(self.status.0);
        buf.put_slice(self.token.as_bytes());
    }

    fn decode(mut buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        let sequence = buf.get_u64();
        let status = Status(buf.get_u8());
        let token = get_token(&mut buf);
        Some(Self {
            sequence,
            status,
            token,
        })
    }

    fn status(&self) -> Status {
        self.status
    }

    fn token(&self) -> &Token {
        &self.token
    }
}

// =============================================================================
// Hash Record
// =============================================================================

/// Record of the content-addressed shard store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashRecord {
    pub hash: ContentHash,
    /// Times this content has been seen
    pub occurrence_count: u32,
    /// Caller-maintained number of the latest occurrence
    pub last_occurrence: u32,
    pub status: Status,
    pub token: Token,
}

impl HashRecord {
    /// Offset of `occurrence_count` within the record
    pub const OCCURRENCE_OFFSET: usize = HASH_LEN;

    /// Offset of `last_occurrence` within the record
    pub const LAST_OCCURRENCE_OFFSET: usize = HASH_LEN + 4;
}

impl FixedRecord for HashRecord {
    /// Hash (16) + Count (4) + LastOccurrence (4) + Status (1) + Token (36)
    const LEN: usize = HASH_LEN + 4 + 4 + 1 + TOKEN_LEN;
    const STATUS_OFFSET: usize = HASH_LEN + 8;

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.hash.0);
        buf.put_u32(self.occurrence_count);
        buf.put_u32(self.last_occurrence);
        buf.put_u8(self.status.0);
        buf.put_slice(self.token.as_bytes());
    }

    fn decode(mut buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        let mut hash = [0u8; HASH_LEN];
        buf.copy_to_slice(&mut hash);
        let occurrence_count = buf.get_u32();
        let last_occurrence = buf.get_u32();
        let status = Status(buf.get_u8());
        let token = get_token(&mut buf);
        Some(Self {
            hash: ContentHash(hash),
            occurrence_count,
            last_occurrence,
            status,
            token,
        })
    }

    fn status(&self) -> Status {
        self.status
    }

    fn token(&self) -> &Token {
        &self.token
    }
}

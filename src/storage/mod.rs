//! Storage Module
//!
//! File plumbing beneath the record stores.
//!
//! ## Responsibilities
//! - Per-key lock set (`KeyLocks`)
//! - Per-key open file cache, optionally bounded (`HandleCache`)
//! - Positioned header/record I/O over the fixed layout (`RecordFile`)
//!
//! ## Locking Discipline
//! ```text
//! global map mutex ──(find/insert Arc, released)──▶ per-key mutex ──▶ file I/O
//! ```
//! The global mutex is never held across I/O. A key's mutex is held for the
//! whole of any operation on that key, reads included.

mod file;
mod handles;
mod locks;

pub(crate) use file::RecordFile;
pub use handles::{HandleCache, KeySlot, OpenMode, DATA_FILENAME};
pub use locks::KeyLocks;

use crate::error::{Result, StoreError};

/// Reject keys that cannot safely name a file or directory
///
/// Keys are used verbatim as path components, so separators, NUL and the
/// `.`/`..` entries are refused.
pub fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(&['/', '\\', '\0'][..]);
    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

//! Sequence Store
//!
//! The keyed record store: one `{root}/{key}/data` file per key, each a header
//! followed by fixed-width `SequenceRecord` slots.
//!
//! ## Responsibilities
//! - Allocate per-key sequence numbers (append)
//! - Mutate status bytes in place (single and batch)
//! - Serve status/token/count/watermark lookups
//! - Warm the handle cache from disk on open, drain it on `close_all`

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::layout::{Header, SequenceRecord, Status};
use crate::storage::{validate_key, HandleCache, OpenMode, RecordFile};
use crate::token::{Token, TokenSource, UuidTokenSource};

/// The sequence-numbered record store
///
/// ## Concurrency Model: Exclusive Per Key
///
/// - Every operation on a key, read or write, holds that key's mutex for its
///   whole duration (header read → record write → header write → sync).
/// - Operations on different keys never wait on each other.
/// - The global key map is locked only to find or create a key's entry.
/// - `close_all` holds every key's mutex at once while it drops handles.
pub struct SequenceStore {
    /// Store configuration
    config: Config,

    /// Per-key locks and their open files
    handles: HandleCache,

    /// Generator for new records' correlation tokens
    tokens: Arc<dyn TokenSource>,
}

impl SequenceStore {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Validate config
    /// 2. Create the root directory
    /// 3. Discover `{key}/data` files, registering and opening them
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_tokens(config, Arc::new(UuidTokenSource))
    }

    /// Open with a custom token source
    pub fn open_with_tokens(config: Config, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.root_dir)?;

        let handles = HandleCache::new(
            &config.root_dir,
            config.max_open_files,
            config.sync_policy,
        );
        let discovered = handles.warm()?;

        tracing::info!(
            "Opened sequence store at {} ({} keys, {} handles open)",
            config.root_dir.display(),
            discovered,
            handles.open_count()
        );

        Ok(Self {
            config,
            handles,
            tokens,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified root directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().root_dir(path).build())
    }

    // =========================================================================
    // Append
    // =========================================================================

    /// Append a record with `status` and return its sequence number
    ///
    /// Steps (under the key's lock):
    /// 1. Read header (a file shorter than a header counts as empty)
    /// 2. Write the new record into slot `total + 1`
    /// 3. Write the header with the incremented count
    /// 4. Sync
    ///
    /// The slot is written before the header that counts it, so a reader never
    /// sees a count covering bytes that are not there. On error the append may
    /// or may not have happened; re-read `record_count` before retrying.
    pub fn append(&self, key: &str, status: Status) -> Result<u64> {
        self.with_key(key, OpenMode::Create, |file| {
            let mut header = file.header_or_empty::<SequenceRecord>()?;

            let sequence = header.total_records + 1;
            if sequence == 1 {
                header.last_updated = 0;
            }

            let record = SequenceRecord {
                sequence,
                status,
                token: self.tokens.next_token(),
            };
            file.write_record(sequence, &record)?;

            header.total_records = sequence;
            file.write_header(&header)?;
            file.sync()?;

            tracing::trace!("Appended record {} to '{}'", sequence, key);
            Ok(sequence)
        })
    }

    // =========================================================================
    // Status Updates
    // =========================================================================

    /// Overwrite the status byte of one record
    ///
    /// Touches exactly one byte; the header is left alone.
    pub fn set_status(&self, key: &str, sequence: u64, status: Status) -> Result<()> {
        self.with_key(key, OpenMode::Existing, |file| {
            let header = file.header::<SequenceRecord>()?;
            check_range(key, sequence, &header)?;

            file.write_status::<SequenceRecord>(sequence, status)?;
            file.sync()?;

            tracing::trace!("Set status of '{}' #{} to {}", key, sequence, status);
            Ok(())
        })
    }

    /// Mark every listed record confirmed, then set the header watermark
    ///
    /// Records are written in list order without sorting or dedup. The first
    /// out-of-range number aborts the batch with `OutOfRange`; records written
    /// before it stay confirmed and the watermark is not moved. On success the
    /// watermark becomes the last element of `sequences`.
    pub fn set_statuses(&self, key: &str, sequences: &[u64]) -> Result<()> {
        validate_key(key)?;
        let last = match sequences.last() {
            Some(&last) => last,
            None => return Ok(()),
        };

        self.with_key(key, OpenMode::Existing, |file| {
            let mut header = file.header::<SequenceRecord>()?;

            for &sequence in sequences {
                check_range(key, sequence, &header)?;
                file.write_status::<SequenceRecord>(sequence, Status::CONFIRMED)?;
            }

            header.last_updated = last;
            file.write_header(&header)?;
            file.sync()?;

            tracing::trace!(
                "Confirmed {} records of '{}', watermark {}",
                sequences.len(),
                key,
                last
            );
            Ok(())
        })
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Status of record `sequence`
    pub fn status(&self, key: &str, sequence: u64) -> Result<Status> {
        Ok(self.record(key, sequence)?.status)
    }

    /// Correlation token of record `sequence`
    pub fn token(&self, key: &str, sequence: u64) -> Result<Token> {
        Ok(self.record(key, sequence)?.token)
    }

    /// Full record `sequence`
    pub fn record(&self, key: &str, sequence: u64) -> Result<SequenceRecord> {
        self.with_key(key, OpenMode::Existing, |file| {
            let header = file.header::<SequenceRecord>()?;
            check_range(key, sequence, &header)?;
            file.read_record(sequence)
        })
    }

    /// Every record of `key`, in sequence order
    pub fn records(&self, key: &str) -> Result<Vec<SequenceRecord>> {
        self.with_key(key, OpenMode::Existing, |file| {
            let header = file.header::<SequenceRecord>()?;
            file.read_records(&header)
        })
    }

    /// Sequence numbers of `key` whose status is still pending
    pub fn pending(&self, key: &str) -> Result<Vec<u64>> {
        Ok(self
            .records(key)?
            .into_iter()
            .filter(|record| record.status == Status::PENDING)
            .map(|record| record.sequence)
            .collect())
    }

    /// Number of records appended to `key` (also its last sequence number)
    pub fn record_count(&self, key: &str) -> Result<u64> {
        Ok(self.header(key)?.total_records)
    }

    /// Header watermark: last element of the most recent `set_statuses` batch
    pub fn last_updated(&self, key: &str) -> Result<u64> {
        Ok(self.header(key)?.last_updated)
    }

    /// Header of `key`'s file
    pub fn header(&self, key: &str) -> Result<Header> {
        self.with_key(key, OpenMode::Existing, |file| {
            file.header::<SequenceRecord>()
        })
    }

    /// Whether `key` has a data file
    pub fn contains_key(&self, key: &str) -> bool {
        validate_key(key).is_ok() && self.handles.data_path(key).is_file()
    }

    /// Keys discovered on open or touched since, sorted
    pub fn keys(&self) -> Vec<String> {
        self.handles.keys()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close every open file handle
    ///
    /// Waits for in-flight operations on every key, then drops all handles.
    /// The store stays usable; files reopen on next access.
    pub fn close_all(&self) -> usize {
        let closed = self.handles.close_all();
        tracing::info!("Closed {} data file handles", closed);
        closed
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the root directory path
    pub fn root_dir(&self) -> &Path {
        &self.config.root_dir
    }

    /// Number of currently open file handles
    pub fn open_handle_count(&self) -> usize {
        self.handles.open_count()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Run `op` on `key`'s file while holding the key's lock
    fn with_key<T>(
        &self,
        key: &str,
        mode: OpenMode,
        op: impl FnOnce(&mut RecordFile<'_>) -> Result<T>,
    ) -> Result<T> {
        validate_key(key)?;

        let slot = match mode {
            OpenMode::Create => self.handles.slot(key),
            OpenMode::Existing => self
                .handles
                .existing_slot(key)
                .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))?,
        };

        let mut guard = slot.lock();
        let mut file = self.handles.open(&mut guard, mode)?;
        let result = op(&mut file);

        if let Err(StoreError::Corrupt { path, reason }) = &result {
            tracing::warn!("Corrupt data file {} for '{}': {}", path.display(), key, reason);
        }
        result
    }
}

/// Reject record index 0 and anything past the header's count
fn check_range(key: &str, index: u64, header: &Header) -> Result<()> {
    if index == 0 || index > header.total_records {
        return Err(StoreError::OutOfRange {
            key: key.to_string(),
            index,
            total: header.total_records,
        });
    }
    Ok(())
}

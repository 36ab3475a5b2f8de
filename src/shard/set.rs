//! Shard Set
//!
//! All shard files of one key, opened in creation order.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::config::SyncPolicy;
use crate::error::{Result, StoreError};
use crate::layout::{ContentHash, HashRecord, Header, Status, HEADER_LEN};
use crate::storage::RecordFile;
use crate::token::TokenSource;

/// File extension of shard files
pub const SHARD_EXTENSION: &str = "vmo";

/// Where a content hash lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashLocation {
    /// Zero-based shard number
    pub shard: u32,

    /// 1-based record index within that shard
    pub index: u64,
}

/// One open shard file
struct Shard {
    number: u32,
    path: PathBuf,
    file: File,
    /// Write-through copy of the on-disk header
    header: Header,
    /// hash → 1-based slot index
    index: HashMap<ContentHash, u64>,
}

impl Shard {
    /// Open shard `number`, creating the file if it is missing, and index its records
    ///
    /// A file shorter than a header (a shard whose creation was interrupted)
    /// counts as empty and gets a fresh header written.
    fn open(path: PathBuf, number: u32, sync_policy: SyncPolicy) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let (header, records) = {
            let mut rf = RecordFile::new(&mut file, &path, sync_policy);
            let torn = rf.len()? < HEADER_LEN as u64;
            let header = rf.header_or_empty::<HashRecord>()?;
            if torn {
                rf.write_header(&header)?;
                rf.sync()?;
                tracing::debug!("Initialized header of shard {}", path.display());
            }
            let records = rf.read_records::<HashRecord>(&header)?;
            (header, records)
        };

        let mut index = HashMap::with_capacity(records.len());
        for (slot, record) in records.iter().enumerate() {
            index.entry(record.hash).or_insert(slot as u64 + 1);
        }

        Ok(Self {
            number,
            path,
            file,
            header,
            index,
        })
    }

    fn io(&mut self, sync_policy: SyncPolicy) -> RecordFile<'_> {
        RecordFile::new(&mut self.file, &self.path, sync_policy)
    }
}

/// Every shard of one key, oldest first
pub struct ShardSet {
    key: String,
    root: PathBuf,
    capacity: u64,
    sync_policy: SyncPolicy,
    shards: Vec<Shard>,
}

impl ShardSet {
    /// Open `{root}/{key}_N.vmo` for N = 0, 1, … until the first missing file
    ///
    /// Creates shard 0 when the key has no shards yet.
    pub fn open(root: &Path, key: &str, capacity: u64, sync_policy: SyncPolicy) -> Result<Self> {
        let mut shards = Vec::new();
        loop {
            let number = shards.len() as u32;
            let path = Self::shard_path(root, key, number);
            if !path.is_file() {
                break;
            }
            shards.push(Shard::open(path, number, sync_policy)?);
        }

        if shards.is_empty() {
            let path = Self::shard_path(root, key, 0);
            shards.push(Shard::open(path, 0, sync_policy)?);
            tracing::debug!("Created shard 0 for '{}'", key);
        }

        Ok(Self {
            key: key.to_string(),
            root: root.to_path_buf(),
            capacity,
            sync_policy,
            shards,
        })
    }

    /// Path of shard `number` for `key`
    pub fn shard_path(root: &Path, key: &str, number: u32) -> PathBuf {
        root.join(format!("{}_{}.{}", key, number, SHARD_EXTENSION))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Append a new record for `hash` to the newest shard
    ///
    /// Opens a new shard first when the newest one is at capacity. A hash
    /// already present in any shard is rejected with `AlreadyExists`.
    pub fn append(
        &mut self,
        hash: ContentHash,
        status: Status,
        tokens: &dyn TokenSource,
    ) -> Result<HashLocation> {
        if self.locate(&hash).is_some() {
            return Err(StoreError::AlreadyExists(hash));
        }

        let full = self
            .shards
            .last()
            .map_or(true, |shard| shard.header.total_records >= self.capacity);
        if full {
            self.roll_over()?;
        }

        let sync_policy = self.sync_policy;
        let shard = self
            .shards
            .last_mut()
            .ok_or_else(|| StoreError::KeyNotFound(self.key.clone()))?;

        let index = shard.header.total_records + 1;
        let record = HashRecord {
            hash,
            occurrence_count: 1,
            last_occurrence: 0,
            status,
            token: tokens.next_token(),
        };

        let mut header = shard.header;
        header.total_records = index;
        {
            let mut io = shard.io(sync_policy);
            io.write_record(index, &record)?;
            io.write_header(&header)?;
            io.sync()?;
        }
        shard.header = header;
        shard.index.insert(hash, index);

        tracing::trace!("Appended {} to '{}' shard {} #{}", hash, self.key, shard.number, index);
        Ok(HashLocation {
            shard: shard.number,
            index,
        })
    }

    /// Increment the occurrence counter of `hash` in place; returns the new count
    pub fn record_occurrence(&mut self, hash: &ContentHash) -> Result<u32> {
        let sync_policy = self.sync_policy;
        let (shard, index) = self.find_mut(hash)?;
        let mut io = shard.io(sync_policy);

        let record: HashRecord = io.read_record(index)?;
        let count = record.occurrence_count.saturating_add(1);
        io.write_u32_field::<HashRecord>(index, HashRecord::OCCURRENCE_OFFSET, count)?;
        io.sync()?;
        Ok(count)
    }

    /// Overwrite the `last_occurrence` field of `hash` in place
    pub fn set_last_occurrence(&mut self, hash: &ContentHash, value: u32) -> Result<()> {
        let sync_policy = self.sync_policy;
        let (shard, index) = self.find_mut(hash)?;
        let mut io = shard.io(sync_policy);

        io.write_u32_field::<HashRecord>(index, HashRecord::LAST_OCCURRENCE_OFFSET, value)?;
        io.sync()
    }

    /// Overwrite the status byte of `hash` and move its shard's watermark to it
    pub fn set_status(&mut self, hash: &ContentHash, status: Status) -> Result<()> {
        let sync_policy = self.sync_policy;
        let (shard, index) = self.find_mut(hash)?;

        let mut header = shard.header;
        header.last_updated = index;
        {
            let mut io = shard.io(sync_policy);
            io.write_status::<HashRecord>(index, status)?;
            io.write_header(&header)?;
            io.sync()?;
        }
        shard.header = header;
        Ok(())
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// First shard (oldest first) that indexes `hash`
    pub fn locate(&self, hash: &ContentHash) -> Option<HashLocation> {
        self.shards.iter().find_map(|shard| {
            shard.index.get(hash).map(|&index| HashLocation {
                shard: shard.number,
                index,
            })
        })
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.locate(hash).is_some()
    }

    /// Read the record for `hash` from disk
    pub fn record(&mut self, hash: &ContentHash) -> Result<HashRecord> {
        let sync_policy = self.sync_policy;
        let (shard, index) = self.find_mut(hash)?;
        shard.io(sync_policy).read_record(index)
    }

    /// Sum of every shard's record count
    pub fn total_records(&self) -> u64 {
        self.shards.iter().map(|shard| shard.header.total_records).sum()
    }

    /// Per-shard record counts, oldest first
    pub fn shard_totals(&self) -> Vec<u64> {
        self.shards.iter().map(|shard| shard.header.total_records).collect()
    }

    /// Header of shard `number`
    pub fn shard_header(&self, number: u32) -> Option<Header> {
        self.shards.get(number as usize).map(|shard| shard.header)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn roll_over(&mut self) -> Result<()> {
        let number = self.shards.len() as u32;
        let path = Self::shard_path(&self.root, &self.key, number);
        self.shards.push(Shard::open(path, number, self.sync_policy)?);

        tracing::debug!(
            "Shard capacity {} reached for '{}', opened shard {}",
            self.capacity,
            self.key,
            number
        );
        Ok(())
    }

    /// Shard holding `hash` and the record's slot index in it
    fn find_mut(&mut self, hash: &ContentHash) -> Result<(&mut Shard, u64)> {
        let location = self
            .locate(hash)
            .ok_or(StoreError::HashNotFound(*hash))?;
        let shard = self
            .shards
            .get_mut(location.shard as usize)
            .ok_or(StoreError::HashNotFound(*hash))?;
        Ok((shard, location.index))
    }
}

impl std::fmt::Debug for ShardSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardSet")
            .field("key", &self.key)
            .field("capacity", &self.capacity)
            .field("shards", &self.shard_totals())
            .finish()
    }
}

//! Shard Store
//!
//! Multi-key front end for shard sets.
//!
//! ## Responsibilities
//! - Discover existing `{key}_0.vmo` files on startup and load their sets
//! - Serialize all work on a key behind that key's lock
//! - Create a key's first shard on its first append
//! - Drop every open shard on `close_all`

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::layout::{ContentHash, HashRecord, Header, Status};
use crate::storage::{validate_key, KeyLocks};
use crate::token::{Token, TokenSource, UuidTokenSource};

use super::set::{HashLocation, ShardSet, SHARD_EXTENSION};

/// Content-addressed store over per-key shard sets
///
/// ## Concurrency:
/// - `sets`: one mutex per key, holding that key's loaded `ShardSet`
///   (None until first use or after `close_all`)
/// - Every method locks exactly one key, except `close_all` which takes all
pub struct ShardStore {
    /// Store configuration
    config: Config,

    /// Per-key lock set owning each key's open shards
    sets: KeyLocks<Option<ShardSet>>,

    /// Generator for new records' correlation tokens
    tokens: Arc<dyn TokenSource>,
}

impl ShardStore {
    /// Open or create a shard store with the given config
    ///
    /// On startup:
    /// 1. Validate config and create the root directory
    /// 2. Discover keys from `{key}_0.vmo` files
    /// 3. Load each key's shards and rebuild their hash indexes
    ///
    /// A key that fails to load stays registered and reports its error on
    /// each operation; the other keys are unaffected.
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_tokens(config, Arc::new(UuidTokenSource))
    }

    /// Open with a custom token source
    pub fn open_with_tokens(config: Config, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.root_dir)?;

        let store = Self {
            config,
            sets: KeyLocks::new(),
            tokens,
        };

        let keys = Self::discover_keys(&store.config.root_dir)?;
        for key in &keys {
            if let Err(e) = store.with_set(key, false, |_| Ok(())) {
                tracing::warn!("Failed to load shards for '{}': {}", key, e);
            }
        }

        tracing::info!(
            "Opened shard store at {} ({} keys)",
            store.config.root_dir.display(),
            keys.len()
        );
        Ok(store)
    }

    /// Open with a path (convenience method)
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().root_dir(path).build())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Record a new content hash under `key`
    pub fn append(&self, key: &str, hash: ContentHash, status: Status) -> Result<HashLocation> {
        self.with_set(key, true, |set| set.append(hash, status, self.tokens.as_ref()))
    }

    /// Bump the occurrence counter of `hash`; returns the new count
    pub fn record_occurrence(&self, key: &str, hash: &ContentHash) -> Result<u32> {
        self.with_set(key, false, |set| set.record_occurrence(hash))
    }

    /// Overwrite the `last_occurrence` field of `hash`
    pub fn set_last_occurrence(&self, key: &str, hash: &ContentHash, value: u32) -> Result<()> {
        self.with_set(key, false, |set| set.set_last_occurrence(hash, value))
    }

    /// Overwrite the status of `hash`, moving its shard's watermark
    pub fn set_status(&self, key: &str, hash: &ContentHash, status: Status) -> Result<()> {
        self.with_set(key, false, |set| set.set_status(hash, status))
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn record(&self, key: &str, hash: &ContentHash) -> Result<HashRecord> {
        self.with_set(key, false, |set| set.record(hash))
    }

    pub fn status(&self, key: &str, hash: &ContentHash) -> Result<Status> {
        Ok(self.record(key, hash)?.status)
    }

    pub fn token(&self, key: &str, hash: &ContentHash) -> Result<Token> {
        Ok(self.record(key, hash)?.token)
    }

    pub fn occurrence_count(&self, key: &str, hash: &ContentHash) -> Result<u32> {
        Ok(self.record(key, hash)?.occurrence_count)
    }

    pub fn last_occurrence(&self, key: &str, hash: &ContentHash) -> Result<u32> {
        Ok(self.record(key, hash)?.last_occurrence)
    }

    /// Shard and slot of `hash`, if recorded
    pub fn locate(&self, key: &str, hash: &ContentHash) -> Result<Option<HashLocation>> {
        self.with_set(key, false, |set| Ok(set.locate(hash)))
    }

    pub fn contains(&self, key: &str, hash: &ContentHash) -> Result<bool> {
        Ok(self.locate(key, hash)?.is_some())
    }

    /// Records across all of `key`'s shards, summed from shard headers
    pub fn total_records(&self, key: &str) -> Result<u64> {
        self.with_set(key, false, |set| Ok(set.total_records()))
    }

    /// Per-shard record counts, oldest first
    pub fn shard_totals(&self, key: &str) -> Result<Vec<u64>> {
        self.with_set(key, false, |set| Ok(set.shard_totals()))
    }

    /// Header of shard `number` of `key`
    pub fn shard_header(&self, key: &str, number: u32) -> Result<Option<Header>> {
        self.with_set(key, false, |set| Ok(set.shard_header(number)))
    }

    pub fn shard_count(&self, key: &str) -> Result<usize> {
        self.with_set(key, false, |set| Ok(set.shard_count()))
    }

    /// Keys discovered on open or touched since, sorted
    pub fn keys(&self) -> Vec<String> {
        self.sets.keys()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close every loaded shard set
    ///
    /// Holds every key lock at once while dropping the sets; sets reload (and
    /// re-index) from disk on next access. Returns the number of shard files closed.
    pub fn close_all(&self) -> usize {
        let slots = self.sets.snapshot();
        let mut guards: Vec<_> = slots.iter().map(|(_, slot)| slot.lock()).collect();

        let closed: usize = guards
            .iter_mut()
            .filter_map(|guard| guard.take())
            .map(|set| set.shard_count())
            .sum();
        drop(guards);

        tracing::info!("Closed {} shard files", closed);
        closed
    }

    /// Get the root directory path
    pub fn root_dir(&self) -> &Path {
        &self.config.root_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Run `op` on `key`'s shard set while holding the key's lock
    ///
    /// Loads the set from disk if needed. Without `create`, a key with no
    /// shard 0 on disk is `KeyNotFound` and nothing is created.
    fn with_set<T>(
        &self,
        key: &str,
        create: bool,
        op: impl FnOnce(&mut ShardSet) -> Result<T>,
    ) -> Result<T> {
        validate_key(key)?;

        let slot = match self.sets.get(key) {
            Some(slot) => slot,
            None if create || self.first_shard_path(key).is_file() => self.sets.lock_for(key),
            None => return Err(StoreError::KeyNotFound(key.to_string())),
        };

        let mut guard = slot.lock();
        let set = match guard.take() {
            Some(set) => set,
            None => {
                if !create && !self.first_shard_path(key).is_file() {
                    return Err(StoreError::KeyNotFound(key.to_string()));
                }
                ShardSet::open(
                    &self.config.root_dir,
                    key,
                    self.config.shard_capacity,
                    self.config.sync_policy,
                )?
            }
        };
        op(guard.insert(set))
    }

    fn first_shard_path(&self, key: &str) -> PathBuf {
        ShardSet::shard_path(&self.config.root_dir, key, 0)
    }

    /// Keys owning a `{key}_0.vmo` file in `root`
    fn discover_keys(root: &Path) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(key) = Self::parse_first_shard(&entry.path()) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// "images_0.vmo" → Some("images")
    fn parse_first_shard(path: &Path) -> Option<String> {
        if path.extension()?.to_str()? != SHARD_EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let (key, number) = stem.rsplit_once('_')?;
        if number != "0" || validate_key(key).is_err() {
            return None;
        }
        Some(key.to_string())
    }
}

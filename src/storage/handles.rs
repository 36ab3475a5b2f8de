//! File Handle Cache
//!
//! Memoizes one open file per key. Each handle lives inside its key's lock
//! (`KeySlot`), so whoever holds the lock owns the handle and nothing can
//! close it underneath a running operation.
//!
//! ## Bounded Mode
//! With `max_open` set, opening a handle past the limit closes the least
//! recently used handles. Eviction only `try_lock`s other keys: a key that is
//! busy is skipped, never waited on. Evicted keys reopen on next use.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::SyncPolicy;
use crate::error::{Result, StoreError};

use super::file::RecordFile;
use super::locks::KeyLocks;
use super::validate_key;

/// Name of the per-key data file inside `<root>/<key>/`
pub const DATA_FILENAME: &str = "data";

/// How `HandleCache::open` treats a missing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create the key's directory and file if absent (appends)
    Create,

    /// Fail with `KeyNotFound` if absent (lookups and updates)
    Existing,
}

/// State guarded by a key's lock
#[derive(Debug)]
pub struct KeySlot {
    key: String,
    path: PathBuf,
    file: Option<File>,
    /// Logical clock value of the last `open` call (LRU order)
    last_used: u64,
}

impl KeySlot {
    fn new(key: &str, path: PathBuf) -> Self {
        Self {
            key: key.to_string(),
            path,
            file: None,
            last_used: 0,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

/// Per-key handle cache backed by the per-key lock set
pub struct HandleCache {
    /// Store root; key files live at `{root}/{key}/data`
    root: PathBuf,

    /// Lock set; each entry owns that key's handle
    slots: KeyLocks<KeySlot>,

    /// Upper bound on open handles (None = unbounded)
    max_open: Option<usize>,

    /// Currently open handles
    open: AtomicUsize,

    /// LRU clock
    clock: AtomicU64,

    /// Durability applied by every `RecordFile` handed out
    sync_policy: SyncPolicy,
}

impl HandleCache {
    pub fn new(root: impl Into<PathBuf>, max_open: Option<usize>, sync_policy: SyncPolicy) -> Self {
        Self {
            root: root.into(),
            slots: KeyLocks::new(),
            max_open,
            open: AtomicUsize::new(0),
            clock: AtomicU64::new(1),
            sync_policy,
        }
    }

    /// Path of a key's data file
    pub fn data_path(&self, key: &str) -> PathBuf {
        self.root.join(key).join(DATA_FILENAME)
    }

    /// Get (or register) the lock slot for `key`
    pub fn slot(&self, key: &str) -> Arc<Mutex<KeySlot>> {
        self.slots
            .lock_for_with(key, || KeySlot::new(key, self.data_path(key)))
    }

    /// Slot for a key that already has a file, without registering unknown keys
    pub fn existing_slot(&self, key: &str) -> Option<Arc<Mutex<KeySlot>>> {
        if let Some(slot) = self.slots.get(key) {
            return Some(slot);
        }
        if self.data_path(key).is_file() {
            return Some(self.slot(key));
        }
        None
    }

    /// Return the slot's file, opening it first if needed
    ///
    /// The caller must hold the slot's lock (it passes the guarded value).
    pub(crate) fn open<'s>(&self, slot: &'s mut KeySlot, mode: OpenMode) -> Result<RecordFile<'s>> {
        let KeySlot {
            key,
            path,
            file,
            last_used,
        } = slot;
        *last_used = self.clock.fetch_add(1, Ordering::Relaxed);

        let (handle, opened) = match file.take() {
            Some(handle) => (handle, false),
            None => (Self::open_file(key, path, mode)?, true),
        };
        let handle = file.insert(handle);

        if opened {
            self.open.fetch_add(1, Ordering::SeqCst);
            self.evict_if_needed();
        }

        Ok(RecordFile::new(handle, path, self.sync_policy))
    }

    /// Register and open every `{root}/{key}/data` file already on disk
    ///
    /// Returns the number of keys discovered. In bounded mode only the first
    /// `max_open` keys get a handle; the rest are registered and open lazily.
    pub fn warm(&self) -> Result<usize> {
        if !self.root.is_dir() {
            return Ok(0);
        }

        let mut discovered = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let key = match entry.file_name().to_str() {
                Some(name) => name.to_string(),
                None => {
                    tracing::warn!("Skipping non-UTF-8 key directory {:?}", entry.path());
                    continue;
                }
            };
            if validate_key(&key).is_err() || !self.data_path(&key).is_file() {
                continue;
            }

            let slot = self.slot(&key);
            let mut guard = slot.lock();
            let has_room = self
                .max_open
                .map_or(true, |max| self.open_count() < max);
            if has_room {
                self.open(&mut guard, OpenMode::Existing)?;
            }
            discovered += 1;
        }

        Ok(discovered)
    }

    /// Close every cached handle
    ///
    /// Takes every key lock (in key order) and holds them all before closing,
    /// so no operation is mid-flight on any handle being dropped. Keys stay
    /// registered and reopen on next use. Returns the number of handles closed.
    pub fn close_all(&self) -> usize {
        let slots = self.slots.snapshot();
        let mut guards: Vec<_> = slots.iter().map(|(_, slot)| slot.lock()).collect();

        let mut closed = 0;
        for guard in guards.iter_mut() {
            if guard.file.take().is_some() {
                closed += 1;
            }
        }
        self.open.fetch_sub(closed, Ordering::SeqCst);
        drop(guards);

        closed
    }

    /// Number of currently open handles
    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Number of registered keys
    pub fn key_count(&self) -> usize {
        self.slots.len()
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        self.slots.keys()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn open_file(key: &str, path: &Path, mode: OpenMode) -> Result<File> {
        match mode {
            OpenMode::Create => {
                if let Some(dir) = path.parent() {
                    fs::create_dir_all(dir)?;
                }
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .open(path)?;
                tracing::debug!("Opened data file for key '{}'", key);
                Ok(file)
            }
            OpenMode::Existing => match OpenOptions::new().read(true).write(true).open(path) {
                Ok(file) => Ok(file),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(StoreError::KeyNotFound(key.to_string()))
                }
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Close least recently used idle handles until under the bound
    fn evict_if_needed(&self) {
        let max = match self.max_open {
            Some(max) => max,
            None => return,
        };
        if self.open_count() <= max {
            return;
        }

        let slots = self.slots.snapshot();
        let mut idle: Vec<_> = slots
            .iter()
            .filter_map(|(_, slot)| slot.try_lock())
            .filter(|guard| guard.is_open())
            .collect();
        idle.sort_by_key(|guard| guard.last_used);

        for mut guard in idle {
            if self.open_count() <= max {
                break;
            }
            if guard.file.take().is_some() {
                self.open.fetch_sub(1, Ordering::SeqCst);
                tracing::debug!("Evicted handle for key '{}'", guard.key);
            }
        }
    }
}

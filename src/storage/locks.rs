//! Per-Key Lock Set
//!
//! One mutex per key, created on first use and never removed. The map itself
//! sits behind a single global mutex that is held only long enough to find or
//! insert an entry, never across file I/O.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Lazily populated map of key → exclusive section guarding `S`
pub struct KeyLocks<S> {
    slots: Mutex<HashMap<String, Arc<Mutex<S>>>>,
}

impl<S> KeyLocks<S> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Get the lock for `key`, creating it with `init` on first use
    pub fn lock_for_with(&self, key: &str, init: impl FnOnce() -> S) -> Arc<Mutex<S>> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(key) {
            return Arc::clone(slot);
        }
        let slot = Arc::new(Mutex::new(init()));
        slots.insert(key.to_string(), Arc::clone(&slot));
        slot
    }

    /// Get the lock for `key` only if it has been created already
    pub fn get(&self, key: &str) -> Option<Arc<Mutex<S>>> {
        self.slots.lock().get(key).cloned()
    }

    /// All registered locks, sorted by key
    ///
    /// Sorted order is the acquisition order for anything that must hold
    /// several key locks at once.
    pub fn snapshot(&self) -> Vec<(String, Arc<Mutex<S>>)> {
        let mut entries: Vec<_> = self
            .slots
            .lock()
            .iter()
            .map(|(key, slot)| (key.clone(), Arc::clone(slot)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.slots.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Default> KeyLocks<S> {
    /// Get the lock for `key`, creating a default-initialized one on first use
    pub fn lock_for(&self, key: &str) -> Arc<Mutex<S>> {
        self.lock_for_with(key, S::default)
    }
}

impl<S> Default for KeyLocks<S> {
    fn default() -> Self {
        Self::new()
    }
}

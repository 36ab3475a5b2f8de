//! Tests for the file handle cache
//!
//! These tests verify:
//! - Warm-up discovers existing key files
//! - Bounded mode keeps open handles at or under the limit
//! - close_all drains every handle and keys reopen on demand
//! - Config validation for handle and shard limits

use std::fs;

use seqstore::config::{Config, SyncPolicy};
use seqstore::storage::{HandleCache, DATA_FILENAME};
use seqstore::{SequenceStore, Status, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn bounded_config(dir: &TempDir, max_open: usize) -> Config {
    Config::builder()
        .root_dir(dir.path())
        .max_open_files(max_open)
        .build()
}

fn populate(dir: &TempDir, keys: &[&str], per_key: u64) {
    let store = SequenceStore::open_path(dir.path()).unwrap();
    for key in keys {
        for _ in 0..per_key {
            store.append(key, Status::PENDING).unwrap();
        }
    }
}

// =============================================================================
// Warm-Up Tests
// =============================================================================

#[test]
fn test_warm_opens_existing_keys() {
    let temp_dir = TempDir::new().unwrap();
    populate(&temp_dir, &["a", "b", "c"], 2);

    let store = SequenceStore::open_path(temp_dir.path()).unwrap();

    assert_eq!(store.keys(), vec!["a", "b", "c"]);
    assert_eq!(store.open_handle_count(), 3);
}

#[test]
fn test_warm_skips_directories_without_data_file() {
    let temp_dir = TempDir::new().unwrap();
    populate(&temp_dir, &["real"], 1);
    fs::create_dir_all(temp_dir.path().join("empty_dir")).unwrap();
    fs::write(temp_dir.path().join("stray_file"), b"x").unwrap();

    let store = SequenceStore::open_path(temp_dir.path()).unwrap();

    assert_eq!(store.keys(), vec!["real"]);
}

#[test]
fn test_warm_respects_bound() {
    let temp_dir = TempDir::new().unwrap();
    populate(&temp_dir, &["a", "b", "c", "d"], 1);

    let store = SequenceStore::open(bounded_config(&temp_dir, 2)).unwrap();

    assert_eq!(store.keys().len(), 4);
    assert!(store.open_handle_count() <= 2);
    for key in ["a", "b", "c", "d"] {
        assert_eq!(store.record_count(key).unwrap(), 1);
    }
}

#[test]
fn test_warm_on_missing_root_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let cache = HandleCache::new(temp_dir.path().join("nope"), None, SyncPolicy::EveryWrite);

    assert_eq!(cache.warm().unwrap(), 0);
    assert_eq!(cache.key_count(), 0);
}

// =============================================================================
// Bounded Mode Tests
// =============================================================================

#[test]
fn test_bounded_cache_never_exceeds_limit() {
    let temp_dir = TempDir::new().unwrap();
    let store = SequenceStore::open(bounded_config(&temp_dir, 2)).unwrap();

    for round in 1..=3u64 {
        for key in ["k1", "k2", "k3", "k4", "k5"] {
            assert_eq!(store.append(key, Status::PENDING).unwrap(), round);
            assert!(store.open_handle_count() <= 2);
        }
    }

    for key in ["k1", "k2", "k3", "k4", "k5"] {
        assert_eq!(store.record_count(key).unwrap(), 3);
    }
}

#[test]
fn test_evicted_key_keeps_its_data() {
    let temp_dir = TempDir::new().unwrap();
    let store = SequenceStore::open(bounded_config(&temp_dir, 1)).unwrap();

    store.append("first", Status::PENDING).unwrap();
    let token = store.token("first", 1).unwrap();
    store.append("second", Status::PENDING).unwrap();
    store.set_statuses("first", &[1]).unwrap();

    assert_eq!(store.open_handle_count(), 1);
    assert_eq!(store.token("first", 1).unwrap(), token);
    assert_eq!(store.status("first", 1).unwrap(), Status::CONFIRMED);
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_close_all_counts_and_drains() {
    let temp_dir = TempDir::new().unwrap();
    let store = SequenceStore::open_path(temp_dir.path()).unwrap();
    for key in ["x", "y", "z"] {
        store.append(key, Status::PENDING).unwrap();
    }

    assert_eq!(store.close_all(), 3);
    assert_eq!(store.open_handle_count(), 0);
    assert_eq!(store.close_all(), 0);
}

#[test]
fn test_keys_stay_registered_after_close_all() {
    let temp_dir = TempDir::new().unwrap();
    let store = SequenceStore::open_path(temp_dir.path()).unwrap();
    store.append("kept", Status::PENDING).unwrap();

    store.close_all();

    assert_eq!(store.keys(), vec!["kept"]);
    assert_eq!(store.record_count("kept").unwrap(), 1);
    assert_eq!(store.open_handle_count(), 1);
}

// =============================================================================
// HandleCache Direct Tests
// =============================================================================

#[test]
fn test_data_path_layout() {
    let temp_dir = TempDir::new().unwrap();
    let cache = HandleCache::new(temp_dir.path(), None, SyncPolicy::EveryWrite);

    assert_eq!(
        cache.data_path("orders"),
        temp_dir.path().join("orders").join(DATA_FILENAME)
    );
}

#[test]
fn test_existing_slot_does_not_register_unknown_key() {
    let temp_dir = TempDir::new().unwrap();
    let cache = HandleCache::new(temp_dir.path(), None, SyncPolicy::EveryWrite);

    assert!(cache.existing_slot("ghost").is_none());
    assert_eq!(cache.key_count(), 0);

    let slot = cache.slot("real");
    assert_eq!(slot.lock().key(), "real");
    assert!(!slot.lock().is_open());
    assert!(cache.existing_slot("real").is_some());
}

// =============================================================================
// Config Validation Tests
// =============================================================================

#[test]
fn test_zero_max_open_files_rejected() {
    let temp_dir = TempDir::new().unwrap();

    let result = SequenceStore::open(bounded_config(&temp_dir, 0));

    assert!(matches!(result, Err(StoreError::Config(_))));
}

#[test]
fn test_zero_shard_capacity_rejected() {
    let config = Config::builder().shard_capacity(0).build();

    assert!(matches!(config.validate(), Err(StoreError::Config(_))));
}

#[test]
fn test_default_config_is_valid() {
    let config = Config::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.sync_policy, SyncPolicy::EveryWrite);
    assert_eq!(config.max_open_files, None);
}

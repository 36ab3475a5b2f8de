//! Tests for the per-key lock set

use std::sync::Arc;

use seqstore::storage::KeyLocks;

#[test]
fn test_lock_for_reuses_entry() {
    let locks: KeyLocks<u32> = KeyLocks::new();

    let a = locks.lock_for("orders");
    *a.lock() = 7;
    let b = locks.lock_for("orders");

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(*b.lock(), 7);
    assert_eq!(locks.len(), 1);
}

#[test]
fn test_lock_for_with_runs_init_once() {
    let locks: KeyLocks<String> = KeyLocks::new();

    locks.lock_for_with("k", || "first".to_string());
    let slot = locks.lock_for_with("k", || "second".to_string());

    assert_eq!(*slot.lock(), "first");
}

#[test]
fn test_get_does_not_create() {
    let locks: KeyLocks<u32> = KeyLocks::new();

    assert!(locks.get("missing").is_none());
    assert!(locks.is_empty());
}

#[test]
fn test_snapshot_sorted_by_key() {
    let locks: KeyLocks<()> = KeyLocks::new();
    for key in ["c", "a", "b"] {
        locks.lock_for(key);
    }

    let keys: Vec<String> = locks.snapshot().into_iter().map(|(k, _)| k).collect();

    assert_eq!(keys, vec!["a", "b", "c"]);
    assert_eq!(locks.keys(), vec!["a", "b", "c"]);
}

//! Tests for the seqstore-cli binary
//!
//! These tests verify both command groups dispatch to their store and
//! that failures exit non-zero.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn cli(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_seqstore-cli"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout.clone()).unwrap()
}

const HASH: &str = "00112233445566778899aabbccddeeff";

// =============================================================================
// Sequence Commands
// =============================================================================

#[test]
fn test_append_and_confirm() {
    let temp_dir = TempDir::new().unwrap();

    assert_eq!(stdout(&cli(temp_dir.path(), &["append", "orders"])), "1\n");
    assert_eq!(stdout(&cli(temp_dir.path(), &["append", "orders"])), "2\n");
    stdout(&cli(temp_dir.path(), &["confirm", "orders", "2"]));

    assert_eq!(stdout(&cli(temp_dir.path(), &["count", "orders"])), "2\n");
    assert_eq!(stdout(&cli(temp_dir.path(), &["last-updated", "orders"])), "2\n");
    assert_eq!(stdout(&cli(temp_dir.path(), &["pending", "orders"])), "1\n");
    assert_eq!(stdout(&cli(temp_dir.path(), &["status", "orders", "2"])), "confirmed\n");
}

#[test]
fn test_unknown_key_fails() {
    let temp_dir = TempDir::new().unwrap();

    let output = cli(temp_dir.path(), &["count", "ghost"]);

    assert!(!output.status.success());
}

// =============================================================================
// Shard Commands
// =============================================================================

#[test]
fn test_hash_add_and_get() {
    let temp_dir = TempDir::new().unwrap();

    assert_eq!(
        stdout(&cli(temp_dir.path(), &["hash-add", "blobs", HASH])),
        "shard 0 record 1\n"
    );
    stdout(&cli(temp_dir.path(), &["hash-status", "blobs", HASH, "1"]));

    let shown = stdout(&cli(temp_dir.path(), &["hash-get", "blobs", HASH]));
    assert!(shown.contains(HASH));
    assert!(shown.contains("confirmed"));
    assert!(temp_dir.path().join("blobs_0.vmo").is_file());
}

#[test]
fn test_hash_add_duplicate_fails() {
    let temp_dir = TempDir::new().unwrap();
    stdout(&cli(temp_dir.path(), &["hash-add", "blobs", HASH]));

    let output = cli(temp_dir.path(), &["hash-add", "blobs", HASH]);

    assert!(!output.status.success());
}

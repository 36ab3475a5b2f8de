//! Configuration for seqstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Default number of records a shard holds before a new shard is opened
pub const DEFAULT_SHARD_CAPACITY: u64 = 1_000_000;

/// Main configuration for a store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure (sequence store):
    ///   {root_dir}/
    ///     ├── {key}/data
    ///     └── ...
    /// Internal structure (shard store):
    ///   {root_dir}/
    ///     ├── {key}_0.vmo
    ///     ├── {key}_1.vmo
    ///     └── ...
    pub root_dir: PathBuf,

    /// Sync strategy: when to fsync after a mutation
    pub sync_policy: SyncPolicy,

    // -------------------------------------------------------------------------
    // Handle Cache Configuration
    // -------------------------------------------------------------------------
    /// Upper bound on simultaneously open key files (None = unbounded)
    pub max_open_files: Option<usize>,

    // -------------------------------------------------------------------------
    // Shard Configuration
    // -------------------------------------------------------------------------
    /// Records per shard file before rolling over to the next shard
    pub shard_capacity: u64,
}

/// Sync strategy for mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// fdatasync before every mutating call returns
    EveryWrite,

    /// Leave flushing to the OS page cache (benchmarks, scratch stores)
    OsBuffered,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./seqstore_data"),
            sync_policy: SyncPolicy::EveryWrite,
            max_open_files: None,
            shard_capacity: DEFAULT_SHARD_CAPACITY,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings no store can run with
    pub fn validate(&self) -> Result<()> {
        if self.shard_capacity == 0 {
            return Err(StoreError::Config(
                "shard_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_open_files == Some(0) {
            return Err(StoreError::Config(
                "max_open_files must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the root directory
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.root_dir = path.into();
        self
    }

    /// Set the sync policy
    pub fn sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.config.sync_policy = policy;
        self
    }

    /// Bound the number of open key files
    pub fn max_open_files(mut self, count: usize) -> Self {
        self.config.max_open_files = Some(count);
        self
    }

    /// Set the per-shard record ceiling
    pub fn shard_capacity(mut self, capacity: u64) -> Self {
        self.config.shard_capacity = capacity;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

//! # seqstore
//!
//! An embedded, fixed-width binary record store with:
//! - Per-key monotonic sequence numbers that survive restarts
//! - In-place status updates that never rewrite or grow a file
//! - A 36-byte correlation token on every record
//! - A content-addressed variant that shards records across numbered files
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────┐     ┌──────────────────────────┐
//! │      SequenceStore       │     │        ShardStore        │
//! │  {root}/{key}/data       │     │  {root}/{key}_{n}.vmo    │
//! └────────────┬─────────────┘     └────────────┬─────────────┘
//!              │                                │
//!              ▼                                ▼
//!   ┌────────────────────┐           ┌────────────────────┐
//!   │    HandleCache     │           │      ShardSet      │
//!   │ (bounded, per key) │           │ (per-shard index)  │
//!   └─────────┬──────────┘           └─────────┬──────────┘
//!             │                                │
//!             └───────────────┬────────────────┘
//!                             ▼
//!               ┌───────────────────────────┐
//!               │ KeyLocks  +  RecordFile   │
//!               │ (per-key mutex, pos. I/O) │
//!               └─────────────┬─────────────┘
//!                             ▼
//!               ┌───────────────────────────┐
//!               │   layout (big-endian)     │
//!               └───────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod layout;
pub mod token;
pub mod storage;
pub mod store;
pub mod shard;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, SyncPolicy};
pub use error::{Result, StoreError};
pub use layout::{ContentHash, HashRecord, Header, SequenceRecord, Status};
pub use shard::{HashLocation, ShardStore};
pub use store::SequenceStore;
pub use token::{Token, TokenSource, UuidTokenSource};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of seqstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

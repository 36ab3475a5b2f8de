//! Shard Module
//!
//! Content-addressed variant of the store. Records are keyed by a 16-byte
//! content hash and spread over numbered shard files: when the newest shard
//! reaches the configured capacity, the next append opens a fresh one.
//!
//! ## Storage Layout
//! ```text
//! {root}/
//!   ├── {key}_0.vmo     # full (capacity records), only updated in place
//!   ├── {key}_1.vmo     # full
//!   └── {key}_2.vmo     # newest, receives appends
//! ```
//!
//! Each shard is a header plus `HashRecord` slots. Every loaded shard keeps an
//! in-memory map of hash → slot index; lookups consult shards oldest first and
//! the first match wins.

mod manager;
mod set;

pub use manager::ShardStore;
pub use set::{HashLocation, ShardSet, SHARD_EXTENSION};

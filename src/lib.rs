//! # shardcache - A Sharded In-Process Cache with TTL Expiry
//!
//! shardcache is a concurrency-safe key/value cache that lives inside your
//! process. Values are kept as plain Rust objects, so there is no
//! serialization and no network round-trip.
//!
//! ## Features
//!
//! - **Sharded Storage**: 256 independent `RwLock`s by default, so callers
//!   only contend when their keys share a shard
//! - **TTL Support**: per-entry expiry with a cache-wide default
//! - **Lazy + Active Expiry**: expired entries are invisible to reads at once
//!   and reclaimed later by a sweep
//! - **Typed Values**: one value type per cache instance
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Cache<V>                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │  CacheKey   │───>│                ShardTable                    │   │
//! │  │  (u64 hash) │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │  └─────────────┘    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │                     │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! │                                               ▲                         │
//! │                     ┌─────────────────────────┴───────────────────────┐ │
//! │                     │                 Janitor                         │ │
//! │                     │         (Background Tokio Task)                 │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use shardcache::{Cache, Expiration};
//! use std::time::Duration;
//!
//! // Entries expire after 5 minutes by default; no janitor
//! let cache: Cache<u64> = Cache::new(Duration::from_secs(300), Duration::ZERO);
//!
//! cache.set("baz", 42, Expiration::Never);
//! assert_eq!(cache.get("baz"), Some(42));
//!
//! cache.set("token", 7, Expiration::After(Duration::from_secs(60)));
//! cache.delete("token");
//! assert_eq!(cache.get("token"), None);
//!
//! // Sweep by hand when no janitor is running
//! cache.delete_expired();
//! assert_eq!(cache.item_count(), 1);
//! ```
//!
//! ## The Janitor
//!
//! A positive cleanup interval starts a background task that calls
//! `delete_expired` on every tick. It always runs on its own thread, so it
//! keeps sweeping after any runtime the cache was built in shuts down. It
//! stops when
//! [`Cache::stop_janitor`] is called or when the last clone of the cache is
//! dropped.
//!
//! ## Keys
//!
//! Keys are reduced to a 64-bit hash and only the hash is stored. `u64` keys
//! are used as-is; text and byte keys are hashed with a per-process seed.
//! Distinct keys with the same hash address the same entry.
//!
//! ## Module Overview
//!
//! - [`storage`]: hashing, shards, the cache engine and the janitor
//! - [`config`]: cache configuration
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::{CacheConfig, DEFAULT_SHARD_COUNT};
pub use error::CacheError;
pub use storage::{Cache, CacheKey, CacheStats, Expiration, JanitorState};

/// Version of shardcache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

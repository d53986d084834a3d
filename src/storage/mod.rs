//! Storage Engine Module
//!
//! This module provides the core storage functionality: key hashing, the
//! sharded entry store, the public [`Cache`] handle, and the background
//! janitor that reclaims expired entries.
//!
//! ## Architecture
//!
//! ```text
//!   caller ──> Cache ──> CacheKey::key_hash ──> ShardTable (hash % N)
//!                                                   │
//!              ┌─────────┐ ┌─────────┐ ┌─────────┐  ▼  ┌─────────┐
//!              │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ ... │ Shard N │
//!              │ RwLock  │ │ RwLock  │ │ RwLock  │     │ RwLock  │
//!              └─────────┘ └─────────┘ └─────────┘     └─────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │          Janitor          │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use shardcache::storage::{Cache, Expiration};
//! use std::time::Duration;
//!
//! let cache: Cache<String> = Cache::new(Duration::from_secs(60), Duration::ZERO);
//!
//! cache.set("name", "Ariz".to_string(), Expiration::Never);
//! assert_eq!(cache.get("name"), Some("Ariz".to_string()));
//!
//! // Integer keys skip hashing entirely
//! cache.set_default(1_000u64, "session".to_string());
//! assert_eq!(cache.item_count(), 2);
//! ```

pub mod engine;
pub mod hash;
pub mod janitor;
mod shard;

// Re-export commonly used types
pub use engine::{Cache, CacheStats, Expiration};
pub use hash::CacheKey;
pub use janitor::JanitorState;

//! Error types for the cache.
//!
//! Misses are not errors: `get` returns `None` for absent or expired keys.
//! Errors are reserved for the conditional writes (`add` / `replace`) and for
//! rejected configuration.

use thiserror::Error;

/// Errors reported by [`Cache`](crate::Cache) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// `add` found a live entry for the key
    #[error("item {key} already exists")]
    AlreadyExists { key: String },

    /// `replace` found no live entry for the key
    #[error("item {key} doesn't exist")]
    NotFound { key: String },

    /// The shard table needs at least one shard
    #[error("invalid shard count: {0} (must be at least 1)")]
    InvalidShardCount(usize),
}

/// Convenience alias for results carrying a [`CacheError`].
pub type Result<T> = std::result::Result<T, CacheError>;

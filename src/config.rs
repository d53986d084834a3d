//! Cache configuration.

use crate::error::{CacheError, Result};
use std::time::Duration;

/// Default number of shards in the shard table.
///
/// More shards means less lock contention but more per-shard overhead.
pub const DEFAULT_SHARD_COUNT: usize = 256;

/// Configuration for a [`Cache`](crate::Cache).
///
/// # Example
///
/// ```
/// use shardcache::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig::default()
///     .with_default_expiration(Duration::from_secs(300))
///     .with_cleanup_interval(Duration::from_secs(600));
///
/// assert_eq!(config.shard_count, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL applied by `set_default` and `Expiration::Default`.
    /// `Duration::ZERO` means entries never expire by default.
    pub default_expiration: Duration,

    /// Interval between janitor sweeps. `Duration::ZERO` disables the janitor.
    pub cleanup_interval: Duration,

    /// Number of independently locked shards (default: 256)
    pub shard_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_expiration: Duration::ZERO,
            cleanup_interval: Duration::ZERO,
            shard_count: DEFAULT_SHARD_COUNT,
        }
    }
}

impl CacheConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default expiration.
    pub fn with_default_expiration(mut self, ttl: Duration) -> Self {
        self.default_expiration = ttl;
        self
    }

    /// Sets the janitor's sweep interval.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Sets the number of shards.
    pub fn with_shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    /// Checks that the configuration can build a cache.
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(CacheError::InvalidShardCount(self.shard_count));
        }
        Ok(())
    }
}

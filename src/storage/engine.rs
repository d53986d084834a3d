//! Cache Engine
//!
//! [`Cache`] is the public face of the storage layer. It composes the shard
//! table with a default TTL policy and an optional janitor.
//!
//! ## Expiry
//!
//! Entries are expired in two ways:
//! 1. **Logically**: reads treat an entry whose deadline has passed as
//!    absent. The entry stays in its shard, so `get` never upgrades its read
//!    lock to a write lock.
//! 2. **Physically**: `delete_expired` (run by hand or by the janitor) walks
//!    every shard and removes what has expired.
//!
//! ## Handles
//!
//! `Cache` is a cheap, clonable handle. All clones share the same shards. The
//! janitor is stopped when the last clone is dropped, or earlier through
//! [`Cache::stop_janitor`].

use crate::config::{CacheConfig, DEFAULT_SHARD_COUNT};
use crate::error::{CacheError, Result};
use crate::storage::hash::CacheKey;
use crate::storage::janitor::{Janitor, JanitorState};
use crate::storage::shard::{Entry, ShardTable};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Per-call TTL for writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Use the cache's default expiration
    Default,
    /// Never expire
    Never,
    /// Expire after the given duration. `Duration::ZERO` never expires.
    After(Duration),
}

impl From<Duration> for Expiration {
    fn from(ttl: Duration) -> Self {
        Expiration::After(ttl)
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads that found a live entry
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// Unconditional and conditional writes that stored an entry
    pub sets: u64,
    /// Entries removed by `delete`
    pub deletes: u64,
    /// Expired entries removed by sweeps, manual or janitor
    pub expired: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
}

struct CacheInner<V> {
    table: Arc<ShardTable<V>>,
    /// None = entries never expire by default
    default_expiration: Option<Duration>,
    janitor: Option<Janitor>,
    counters: Counters,
}

/// A sharded, concurrency-safe key/value cache with per-entry TTL.
///
/// # Thread Safety
///
/// Every operation locks at most one shard at a time. Reads take the shard's
/// shared lock, writes its exclusive lock, so callers only contend when their
/// keys land in the same shard.
///
/// # Example
///
/// ```
/// use shardcache::{Cache, Expiration};
/// use std::time::Duration;
///
/// let cache: Cache<u32> = Cache::new(Duration::from_secs(300), Duration::ZERO);
///
/// cache.set("baz", 42, Expiration::Never);
/// assert_eq!(cache.get("baz"), Some(42));
///
/// cache.set_default("session", 7);
/// cache.delete("session");
/// assert_eq!(cache.get("session"), None);
/// ```
pub struct Cache<V> {
    inner: Arc<CacheInner<V>>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("shards", &self.inner.table.shard_count())
            .field("default_expiration", &self.inner.default_expiration)
            .field(
                "cleanup_interval",
                &self.inner.janitor.as_ref().map(Janitor::interval),
            )
            .finish()
    }
}

impl<V> Default for Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache with [`DEFAULT_SHARD_COUNT`] shards.
    ///
    /// A `default_expiration` of zero means entries never expire unless the
    /// call site says otherwise. A `cleanup_interval` of zero disables the
    /// janitor; expired entries are then only reclaimed by
    /// [`delete_expired`](Self::delete_expired), `delete`, `flush` or
    /// overwrites.
    pub fn new(default_expiration: Duration, cleanup_interval: Duration) -> Self {
        Self::build(CacheConfig {
            default_expiration,
            cleanup_interval,
            shard_count: DEFAULT_SHARD_COUNT,
        })
    }

    /// Creates a cache from an explicit configuration.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: CacheConfig) -> Self {
        let table = Arc::new(ShardTable::new(config.shard_count));

        let janitor = (!config.cleanup_interval.is_zero())
            .then(|| Janitor::start(Arc::clone(&table), config.cleanup_interval));

        debug!(
            shards = config.shard_count,
            default_expiration_ms = config.default_expiration.as_millis() as u64,
            janitor = janitor.is_some(),
            "Cache created"
        );

        Self {
            inner: Arc::new(CacheInner {
                table,
                default_expiration: (!config.default_expiration.is_zero())
                    .then_some(config.default_expiration),
                janitor,
                counters: Counters::default(),
            }),
        }
    }

    /// Resolves a per-call TTL to an absolute deadline.
    fn deadline(&self, ttl: Expiration) -> Option<Instant> {
        let ttl = match ttl {
            Expiration::Default => self.inner.default_expiration?,
            Expiration::Never => return None,
            Expiration::After(ttl) => ttl,
        };
        if ttl.is_zero() {
            return None;
        }
        Instant::now().checked_add(ttl)
    }

    /// Stores `value` under `key`, replacing any existing entry.
    pub fn set(&self, key: impl CacheKey, value: V, ttl: Expiration) {
        let hash = key.key_hash();
        let entry = Entry::new(value, self.deadline(ttl));
        self.inner.table.shard(hash).insert(hash, entry);
        self.inner.counters.sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Stores `value` under `key` with the default expiration.
    pub fn set_default(&self, key: impl CacheKey, value: V) {
        self.set(key, value, Expiration::Default);
    }

    /// Stores `value` only if no live entry exists for `key`.
    ///
    /// An expired entry that has not been swept yet counts as absent.
    pub fn add<K>(&self, key: K, value: V, ttl: Expiration) -> Result<()>
    where
        K: CacheKey + fmt::Debug,
    {
        let hash = key.key_hash();
        let entry = Entry::new(value, self.deadline(ttl));
        if !self
            .inner
            .table
            .shard(hash)
            .insert_if_absent(hash, entry, Instant::now())
        {
            return Err(CacheError::AlreadyExists {
                key: format!("{key:?}"),
            });
        }
        self.inner.counters.sets.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Overwrites the entry for `key` only if a live one exists.
    pub fn replace<K>(&self, key: K, value: V, ttl: Expiration) -> Result<()>
    where
        K: CacheKey + fmt::Debug,
    {
        let hash = key.key_hash();
        let entry = Entry::new(value, self.deadline(ttl));
        if !self
            .inner
            .table
            .shard(hash)
            .replace_if_present(hash, entry, Instant::now())
        {
            return Err(CacheError::NotFound {
                key: format!("{key:?}"),
            });
        }
        self.inner.counters.sets.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Gets the value for `key`.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    pub fn get(&self, key: impl CacheKey) -> Option<V> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Gets the value for `key` along with its deadline.
    ///
    /// The deadline is `None` for entries that never expire.
    pub fn get_with_expiration(&self, key: impl CacheKey) -> Option<(V, Option<Instant>)> {
        self.get_entry(key)
            .map(|entry| (entry.value, entry.expires_at))
    }

    fn get_entry(&self, key: impl CacheKey) -> Option<Entry<V>> {
        let hash = key.key_hash();
        let entry = self.inner.table.shard(hash).get(hash, Instant::now());

        let counter = if entry.is_some() {
            &self.inner.counters.hits
        } else {
            &self.inner.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);

        entry
    }

    /// Removes the entry for `key`, expired or not.
    ///
    /// # Returns
    ///
    /// Returns `true` if an entry was physically removed. Deleting a missing
    /// key is not an error.
    pub fn delete(&self, key: impl CacheKey) -> bool {
        let hash = key.key_hash();
        let removed = self.inner.table.shard(hash).remove(hash);
        if removed {
            self.inner.counters.deletes.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Removes all expired entries from every shard.
    ///
    /// The clock is read once, and that instant decides expiry for all
    /// shards.
    ///
    /// # Returns
    ///
    /// Returns the number of entries removed.
    pub fn delete_expired(&self) -> usize {
        self.inner.table.delete_expired()
    }

    /// Returns the number of entries held in the shards.
    ///
    /// This is an approximation of the live count: it includes entries that
    /// have expired but not yet been swept.
    pub fn item_count(&self) -> usize {
        self.inner.table.item_count()
    }

    /// Removes every entry, expired or not.
    pub fn flush(&self) {
        self.inner.table.flush();
        debug!("Cache flushed");
    }

    /// Returns the fixed number of shards.
    pub fn shard_count(&self) -> usize {
        self.inner.table.shard_count()
    }

    /// Returns the default expiration, or `None` if entries never expire by
    /// default.
    pub fn default_expiration(&self) -> Option<Duration> {
        self.inner.default_expiration
    }

    /// Stops the janitor. Future sweeps only happen through
    /// [`delete_expired`](Self::delete_expired).
    ///
    /// This is called automatically when the last handle is dropped.
    pub fn stop_janitor(&self) {
        if let Some(janitor) = &self.inner.janitor {
            janitor.stop();
        }
    }

    /// Returns the janitor's current state.
    pub fn janitor_state(&self) -> JanitorState {
        self.inner
            .janitor
            .as_ref()
            .map(Janitor::state)
            .unwrap_or(JanitorState::Idle)
    }

    /// Returns cache statistics.
    ///
    /// `expired` covers both [`delete_expired`](Self::delete_expired) and
    /// janitor sweeps.
    pub fn stats(&self) -> CacheStats {
        let counters = &self.inner.counters;
        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            sets: counters.sets.load(Ordering::Relaxed),
            deletes: counters.deletes.load(Ordering::Relaxed),
            expired: self.inner.table.swept(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::thread;

    fn cache<V: Clone + Send + Sync + 'static>() -> Cache<V> {
        Cache::new(Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn test_set_and_get() {
        let cache = cache();

        cache.set("key", "value", Expiration::Never);
        assert_eq!(cache.get("key"), Some("value"));
    }

    #[test]
    fn test_get_nonexistent() {
        let cache: Cache<u32> = cache();
        assert_eq!(cache.get("nonexistent"), None);
        assert_eq!(cache.get(7u64), None);
    }

    #[test]
    fn test_supported_key_types() {
        let cache = cache();

        cache.set(1u64, "u64", Expiration::Never);
        cache.set(-2i32, "i32", Expiration::Never);
        cache.set(3i64, "i64", Expiration::Never);
        cache.set(4u32, "u32", Expiration::Never);
        cache.set(5usize, "usize", Expiration::Never);
        cache.set(b'x', "u8", Expiration::Never);
        cache.set("text", "str", Expiration::Never);
        cache.set(String::from("owned"), "String", Expiration::Never);
        cache.set(vec![1u8, 2, 3], "Vec<u8>", Expiration::Never);
        cache.set(Bytes::from_static(b"bytes"), "Bytes", Expiration::Never);

        assert_eq!(cache.get(1u64), Some("u64"));
        assert_eq!(cache.get(-2i32), Some("i32"));
        assert_eq!(cache.get(3i64), Some("i64"));
        assert_eq!(cache.get(4u32), Some("u32"));
        assert_eq!(cache.get(5usize), Some("usize"));
        assert_eq!(cache.get(b'x'), Some("u8"));
        assert_eq!(cache.get("text"), Some("str"));
        assert_eq!(cache.get("owned"), Some("String"));
        assert_eq!(cache.get(&[1u8, 2, 3][..]), Some("Vec<u8>"));
        assert_eq!(cache.get(b"bytes"), Some("Bytes"));
        assert_eq!(cache.item_count(), 10);
    }

    #[test]
    fn test_overwrite() {
        let cache = cache();

        cache.set("key", 1, Expiration::Never);
        cache.set("key", 2, Expiration::Never);

        assert_eq!(cache.get("key"), Some(2));
        assert_eq!(cache.item_count(), 1);
    }

    #[test]
    fn test_delete() {
        let cache = cache();

        cache.set("key", "value", Expiration::After(Duration::from_secs(60)));
        assert!(cache.delete("key"));
        assert_eq!(cache.get("key"), None);
        assert!(!cache.delete("key")); // Already deleted
    }

    #[test]
    fn test_expiry_is_lazy() {
        let cache = cache();

        cache.set("key", "value", Expiration::After(Duration::from_millis(50)));

        // Key should exist immediately
        assert_eq!(cache.get("key"), Some("value"));

        // Wait for expiry
        thread::sleep(Duration::from_millis(100));

        // Logically gone, physically still present until swept
        assert_eq!(cache.get("key"), None);
        assert_eq!(cache.item_count(), 1);
    }

    #[test]
    fn test_default_expiration() {
        let cache = Cache::new(Duration::from_millis(30), Duration::ZERO);
        assert_eq!(cache.default_expiration(), Some(Duration::from_millis(30)));

        cache.set_default("default", 1);
        cache.set("explicit", 2, Expiration::Default);
        cache.set("never", 3, Expiration::Never);
        cache.set("longer", 4, Expiration::After(Duration::from_secs(60)));

        thread::sleep(Duration::from_millis(80));

        assert_eq!(cache.get("default"), None);
        assert_eq!(cache.get("explicit"), None);
        assert_eq!(cache.get("never"), Some(3));
        assert_eq!(cache.get("longer"), Some(4));
    }

    #[test]
    fn test_zero_default_never_expires() {
        let cache = cache();
        assert_eq!(cache.default_expiration(), None);

        cache.set_default("key", "value");
        assert_eq!(
            cache.get_with_expiration("key"),
            Some(("value", None))
        );
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let cache = Cache::new(Duration::from_millis(1), Duration::ZERO);

        cache.set("key", "value", Expiration::After(Duration::ZERO));
        thread::sleep(Duration::from_millis(10));

        assert_eq!(cache.get("key"), Some("value"));
    }

    #[test]
    fn test_get_with_expiration() {
        let cache = cache();
        let before = Instant::now();

        cache.set("key", "value", Duration::from_secs(60).into());

        let (value, expires_at) = cache.get_with_expiration("key").unwrap();
        assert_eq!(value, "value");
        let expires_at = expires_at.unwrap();
        assert!(expires_at >= before + Duration::from_secs(60));
        assert!(expires_at <= Instant::now() + Duration::from_secs(60));

        assert!(cache.get_with_expiration("missing").is_none());
    }

    #[test]
    fn test_add() {
        let cache = cache();

        assert!(cache.add("key", 1, Expiration::Never).is_ok());
        assert_eq!(
            cache.add("key", 2, Expiration::Never),
            Err(CacheError::AlreadyExists {
                key: "\"key\"".to_string()
            })
        );
        assert_eq!(cache.get("key"), Some(1));
    }

    #[test]
    fn test_add_over_expired_entry() {
        let cache = cache();

        cache.set(9u64, 1, Expiration::After(Duration::from_millis(10)));
        thread::sleep(Duration::from_millis(30));

        assert!(cache.add(9u64, 2, Expiration::Never).is_ok());
        assert_eq!(cache.get(9u64), Some(2));
        assert_eq!(cache.item_count(), 1);
    }

    #[test]
    fn test_replace() {
        let cache = cache();

        assert_eq!(
            cache.replace(42u64, "x", Expiration::Never),
            Err(CacheError::NotFound {
                key: "42".to_string()
            })
        );

        cache.set(42u64, "a", Expiration::Never);
        assert!(cache.replace(42u64, "b", Expiration::Never).is_ok());
        assert_eq!(cache.get(42u64), Some("b"));

        cache.set(43u64, "c", Expiration::After(Duration::from_millis(10)));
        thread::sleep(Duration::from_millis(30));
        assert!(cache.replace(43u64, "d", Expiration::Never).is_err());
    }

    #[test]
    fn test_delete_expired() {
        let cache = cache();

        cache.set("key1", "value1", Expiration::After(Duration::from_millis(10)));
        cache.set("key2", "value2", Expiration::After(Duration::from_millis(10)));
        cache.set("key3", "value3", Expiration::Never);
        cache.set("key4", "value4", Expiration::After(Duration::from_secs(60)));

        thread::sleep(Duration::from_millis(50));

        assert_eq!(cache.item_count(), 4);
        assert_eq!(cache.delete_expired(), 2);
        assert_eq!(cache.item_count(), 2);
        assert_eq!(cache.get("key3"), Some("value3"));
        assert_eq!(cache.get("key4"), Some("value4"));

        // Nothing left to sweep
        assert_eq!(cache.delete_expired(), 0);
        assert_eq!(cache.item_count(), 2);
    }

    #[test]
    fn test_flush() {
        let cache = cache();

        cache.set("key1", "value1", Expiration::Never);
        cache.set("key2", "value2", Expiration::After(Duration::from_secs(60)));

        assert_eq!(cache.item_count(), 2);

        cache.flush();

        assert_eq!(cache.item_count(), 0);
        assert_eq!(cache.get("key1"), None);
        assert_eq!(cache.get("key2"), None);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = cache();
        let other = cache.clone();

        cache.set("key", 1, Expiration::Never);
        assert_eq!(other.get("key"), Some(1));

        other.flush();
        assert_eq!(cache.item_count(), 0);
    }

    #[test]
    fn test_stats() {
        let cache = cache();

        cache.set("a", 1, Expiration::Never);
        cache.set("b", 2, Expiration::After(Duration::from_millis(5)));
        cache.get("a");
        cache.get("missing");
        cache.delete("a");
        cache.delete("a");
        thread::sleep(Duration::from_millis(20));
        cache.delete_expired();

        let stats = cache.stats();
        assert_eq!(stats.sets, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.deletes, 1);
        assert_eq!(stats.expired, 1);
    }

    #[test]
    fn test_with_config() {
        let cache: Cache<u8> =
            Cache::with_config(CacheConfig::default().with_shard_count(8)).unwrap();
        assert_eq!(cache.shard_count(), 8);

        let err = Cache::<u8>::with_config(CacheConfig::default().with_shard_count(0));
        assert_eq!(err.unwrap_err(), CacheError::InvalidShardCount(0));
    }

    #[test]
    fn test_janitor_idle_without_interval() {
        let cache: Cache<u8> = cache();
        assert_eq!(cache.janitor_state(), JanitorState::Idle);
        assert_eq!(cache.shard_count(), DEFAULT_SHARD_COUNT);

        // No-op without a janitor
        cache.stop_janitor();
        assert_eq!(cache.janitor_state(), JanitorState::Idle);
    }

    #[tokio::test]
    async fn test_janitor_runs_and_stops() {
        let cache = Cache::new(Duration::ZERO, Duration::from_millis(10));
        assert_eq!(cache.janitor_state(), JanitorState::Running);

        cache.set("short", 1, Expiration::After(Duration::from_millis(20)));
        cache.set("long", 2, Expiration::Never);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.item_count(), 1);

        cache.stop_janitor();
        assert_eq!(cache.janitor_state(), JanitorState::Stopped);
    }

    #[tokio::test]
    async fn test_stats_count_janitor_sweeps() {
        let cache = Cache::new(Duration::ZERO, Duration::from_millis(10));
        for i in 0..5u64 {
            cache.set(i, i, Expiration::After(Duration::from_millis(5)));
        }

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.item_count(), 0);
        assert_eq!(cache.stats().expired, 5);
        assert_eq!(cache.delete_expired(), 0);
        assert_eq!(cache.stats().expired, 5);
    }

    #[tokio::test]
    async fn test_dropping_last_handle_stops_janitor() {
        let cache: Cache<u32> = Cache::new(Duration::ZERO, Duration::from_millis(10));
        let clone = cache.clone();
        let table = Arc::clone(&cache.inner.table);

        drop(cache);
        tokio::time::sleep(Duration::from_millis(30)).await;

        // A surviving clone keeps the janitor alive
        assert_eq!(clone.janitor_state(), JanitorState::Running);
        assert_eq!(Arc::strong_count(&table), 3);

        drop(clone);
        tokio::time::sleep(Duration::from_millis(30)).await;

        // The task has exited and released its reference to the shards
        assert_eq!(Arc::strong_count(&table), 1);
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(cache());
        let mut handles = vec![];

        // Spawn multiple writers on disjoint keys
        for i in 0..10u64 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for j in 0..100u64 {
                    let key = i * 1_000 + j;
                    cache.set(key, key, Expiration::Never);
                    assert_eq!(cache.get(key), Some(key));
                    if j % 2 == 0 {
                        cache.delete(key);
                        assert_eq!(cache.get(key), None);
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.item_count(), 500);
    }

    #[test]
    fn test_concurrent_writers_same_key() {
        let cache = cache();
        let handles: Vec<_> = (0..8u32)
            .map(|t| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        cache.set("shared", t, Expiration::Never);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let value = cache.get("shared").unwrap();
        assert!(value < 8);
        assert_eq!(cache.item_count(), 1);
    }
}

//! Shards and the Shard Table
//!
//! The key space is split into a fixed number of shards, each with its own
//! `RwLock`. A hash is routed to shard `hash % shard_count`, so operations on
//! keys in different shards never contend.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ShardTable                            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bulk operations (sweep, count, flush) walk the shards in table order and
//! hold at most one shard lock at a time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// Represents a stored value with optional expiry time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry<V> {
    /// The actual value stored
    pub(crate) value: V,
    /// When this entry expires (None = never expires)
    pub(crate) expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    /// Creates a new entry.
    pub(crate) fn new(value: V, expires_at: Option<Instant>) -> Self {
        Self { value, expires_at }
    }

    /// Checks if this entry had expired at `now`.
    ///
    /// An entry is still live at the exact instant of its deadline.
    #[inline]
    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now > exp).unwrap_or(false)
    }
}

type ShardMap<V> = HashMap<u64, Entry<V>, ahash::RandomState>;

/// A single shard containing a portion of the entries.
#[derive(Debug)]
pub(crate) struct Shard<V> {
    data: RwLock<ShardMap<V>>,
}

impl<V> Shard<V> {
    fn new() -> Self {
        Self {
            data: RwLock::new(ShardMap::default()),
        }
    }

    // Every mutation is a single map call, so a poisoned lock still guards a
    // consistent map.
    fn read(&self) -> RwLockReadGuard<'_, ShardMap<V>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ShardMap<V>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the entry for `hash` if it is live at `now`.
    pub(crate) fn get(&self, hash: u64, now: Instant) -> Option<Entry<V>>
    where
        V: Clone,
    {
        let data = self.read();
        data.get(&hash)
            .filter(|entry| !entry.is_expired_at(now))
            .cloned()
    }

    /// Inserts or overwrites the entry for `hash`.
    pub(crate) fn insert(&self, hash: u64, entry: Entry<V>) {
        self.write().insert(hash, entry);
    }

    /// Inserts `entry` only if no live entry exists for `hash`.
    ///
    /// Returns `true` if the entry was inserted.
    pub(crate) fn insert_if_absent(&self, hash: u64, entry: Entry<V>, now: Instant) -> bool {
        let mut data = self.write();
        if data.get(&hash).is_some_and(|e| !e.is_expired_at(now)) {
            return false;
        }
        data.insert(hash, entry);
        true
    }

    /// Overwrites the entry for `hash` only if a live one exists.
    ///
    /// Returns `true` if the entry was replaced.
    pub(crate) fn replace_if_present(&self, hash: u64, entry: Entry<V>, now: Instant) -> bool {
        let mut data = self.write();
        match data.get_mut(&hash) {
            Some(existing) if !existing.is_expired_at(now) => {
                *existing = entry;
                true
            }
            _ => false,
        }
    }

    /// Removes the entry for `hash`, expired or not.
    pub(crate) fn remove(&self, hash: u64) -> bool {
        self.write().remove(&hash).is_some()
    }

    /// Removes every entry that had expired at `now`.
    fn remove_expired(&self, now: Instant) -> usize {
        let mut data = self.write();
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired_at(now));
        before - data.len()
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn clear(&self) {
        *self.write() = ShardMap::default();
    }
}

/// A fixed-size array of shards.
///
/// The shard count is chosen once and never changes, so entries never move
/// between shards.
#[derive(Debug)]
pub(crate) struct ShardTable<V> {
    shards: Vec<Shard<V>>,
    /// Expired entries removed by all sweeps, manual or janitor
    swept: AtomicU64,
}

impl<V> ShardTable<V> {
    /// Creates a table of `shard_count` empty shards.
    ///
    /// `shard_count` must be at least 1; see [`CacheConfig::validate`](crate::CacheConfig::validate).
    pub(crate) fn new(shard_count: usize) -> Self {
        debug_assert!(shard_count > 0, "shard table needs at least one shard");
        Self {
            shards: (0..shard_count).map(|_| Shard::new()).collect(),
            swept: AtomicU64::new(0),
        }
    }

    pub(crate) fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Determines which shard a hash belongs to.
    #[inline]
    pub(crate) fn route(&self, hash: u64) -> usize {
        (hash % self.shards.len() as u64) as usize
    }

    /// Gets the shard for a given hash.
    #[inline]
    pub(crate) fn shard(&self, hash: u64) -> &Shard<V> {
        &self.shards[self.route(hash)]
    }

    /// Removes expired entries from every shard.
    ///
    /// The clock is sampled once and that instant is applied to all shards.
    pub(crate) fn delete_expired(&self) -> usize {
        self.delete_expired_at(Instant::now())
    }

    pub(crate) fn delete_expired_at(&self, now: Instant) -> usize {
        let removed: usize = self
            .shards
            .iter()
            .map(|shard| shard.remove_expired(now))
            .sum();
        self.swept.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Returns the total number of entries removed by sweeps.
    pub(crate) fn swept(&self) -> u64 {
        self.swept.load(Ordering::Relaxed)
    }

    /// Counts physically present entries, including expired but unswept ones.
    pub(crate) fn item_count(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    pub(crate) fn flush(&self) {
        for shard in &self.shards {
            shard.clear();
        }
    }
}

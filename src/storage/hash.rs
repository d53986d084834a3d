//! Key Hashing
//!
//! Keys are never stored in the shard maps, only a 64-bit hash of them.
//! This module maps every supported key type to that hash.
//!
//! | Key type                                  | Hash                              |
//! |-------------------------------------------|-----------------------------------|
//! | `u64`                                     | the value itself                  |
//! | `u16`, `u32`, `usize`                     | zero-extended value               |
//! | `i8`, `i16`, `i32`, `i64`, `isize`        | two's complement value as `u64`   |
//! | `u8`                                      | seeded hash of the single byte    |
//! | `str`, `String`, `[u8]`, `Vec<u8>`, `Bytes` | seeded hash of the raw bytes    |
//!
//! Callers that already hold well-distributed `u64` identifiers pay nothing
//! for hashing.
//!
//! The seed for text and byte keys is random and chosen once per process,
//! so hashes are only meaningful within a single run. Never persist them.
//!
//! Key types outside this set do not implement [`CacheKey`] and are rejected
//! at compile time.

use ahash::RandomState;
use bytes::Bytes;
use std::hash::{BuildHasher, Hasher};
use std::sync::OnceLock;

/// Process-wide hasher seed for text and byte keys.
static SEED: OnceLock<RandomState> = OnceLock::new();

/// A type that can address entries in a [`Cache`](crate::Cache).
///
/// Two keys with equal hashes address the same entry, even when they are of
/// different types (`"a"` and `b"a"`, or `1u64` and `1i32`).
pub trait CacheKey {
    /// Returns the 64-bit hash used to route and store this key.
    fn key_hash(&self) -> u64;
}

/// Hashes raw bytes with the process-wide seed.
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = SEED.get_or_init(RandomState::new).build_hasher();
    hasher.write(bytes);
    hasher.finish()
}

impl CacheKey for u64 {
    #[inline]
    fn key_hash(&self) -> u64 {
        *self
    }
}

impl CacheKey for u8 {
    #[inline]
    fn key_hash(&self) -> u64 {
        hash_bytes(&[*self])
    }
}

macro_rules! impl_integer_key {
    ($($t:ty),*) => {
        $(
            impl CacheKey for $t {
                #[inline]
                fn key_hash(&self) -> u64 {
                    *self as u64
                }
            }
        )*
    };
}

impl_integer_key!(u16, u32, usize, i8, i16, i32, i64, isize);

impl CacheKey for str {
    #[inline]
    fn key_hash(&self) -> u64 {
        hash_bytes(self.as_bytes())
    }
}

impl CacheKey for String {
    #[inline]
    fn key_hash(&self) -> u64 {
        hash_bytes(self.as_bytes())
    }
}

impl CacheKey for [u8] {
    #[inline]
    fn key_hash(&self) -> u64 {
        hash_bytes(self)
    }
}

impl<const N: usize> CacheKey for [u8; N] {
    #[inline]
    fn key_hash(&self) -> u64 {
        hash_bytes(self)
    }
}

impl CacheKey for Vec<u8> {
    #[inline]
    fn key_hash(&self) -> u64 {
        hash_bytes(self)
    }
}

impl CacheKey for Bytes {
    #[inline]
    fn key_hash(&self) -> u64 {
        hash_bytes(self)
    }
}

impl<K: CacheKey + ?Sized> CacheKey for &K {
    #[inline]
    fn key_hash(&self) -> u64 {
        (**self).key_hash()
    }
}

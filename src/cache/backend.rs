//! Storage Backend Module
//!
//! The contract every keyed storage strategy implements so the policy core
//! can sit on top of it.

use std::time::Instant;

use crate::cache::CacheEntry;

// == Cache Backend ==
/// Keyed storage for cache entries.
///
/// All methods take `&self`: a backend owns its interior mutability and is
/// responsible for its own thread safety. It must keep at most one entry per
/// key, and once it drops a key (capacity eviction, removal, purge) it must
/// stop returning that key from [`get_entry`](CacheBackend::get_entry).
///
/// The backend never decides validity on its own except in
/// [`remove_expired`](CacheBackend::remove_expired) and
/// [`purge_expired`](CacheBackend::purge_expired), where the caller passes
/// the instant to judge against.
pub trait CacheBackend<K, V> {
    /// Returns a copy of the entry stored under `key`, valid or not.
    ///
    /// Backends with recency bookkeeping treat this as an access.
    fn get_entry(&self, key: &K) -> Option<CacheEntry<V>>;

    /// Stores `entry` under `key`, replacing any previous entry.
    fn put_entry(&self, key: K, entry: CacheEntry<V>);

    /// Removes and returns the entry stored under `key`.
    fn remove_entry(&self, key: &K) -> Option<CacheEntry<V>>;

    /// Removes the entry under `key` only if it is expired at `now`.
    ///
    /// Returns true if an entry was removed. The default implementation
    /// checks and removes in two steps; backends that can do both under one
    /// lock should override it so a fresh entry written in between is kept.
    fn remove_expired(&self, key: &K, now: Instant) -> bool {
        match self.get_entry(key) {
            Some(entry) if entry.is_expired_at(now) => self.remove_entry(key).is_some(),
            _ => false,
        }
    }

    /// Number of stored keys, expired-but-unpurged ones included.
    fn size(&self) -> usize;

    /// Removes every entry.
    fn clear(&self);

    /// Removes every entry expired at `now` and returns how many went.
    fn purge_expired(&self, now: Instant) -> usize;

    /// Number of entries dropped by the backend's capacity policy.
    fn evictions(&self) -> u64 {
        0
    }
}

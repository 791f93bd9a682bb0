//! LRU Store Module
//!
//! Default storage backend combining HashMap storage with LRU tracking and a
//! bounded capacity.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::debug;

use crate::cache::{CacheBackend, CacheEntry, LruTracker};
use crate::error::{CacheError, Result};

#[derive(Debug)]
struct StoreInner<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker<K>,
}

// == LRU Store ==
/// Thread-safe, size-bounded storage with least-recently-used eviction.
///
/// Every operation runs under a single mutex, so the map and the recency
/// queue never disagree. Inserting a new key while full evicts the least
/// recently used key first; overwriting an existing key never evicts.
#[derive(Debug)]
pub struct LruStore<K, V> {
    inner: Mutex<StoreInner<K, V>>,
    /// Maximum number of entries allowed
    max_entries: usize,
    evictions: AtomicU64,
}

impl<K, V> LruStore<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates a new store holding at most `max_entries` entries.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidArgument`] if `max_entries` is zero.
    pub fn new(max_entries: usize) -> Result<Self> {
        if max_entries == 0 {
            return Err(CacheError::InvalidArgument(
                "max_entries must be positive".to_string(),
            ));
        }

        debug!("LRU store created with capacity of {} entries", max_entries);

        Ok(Self {
            inner: Mutex::new(StoreInner {
                entries: HashMap::new(),
                lru: LruTracker::new(),
            }),
            max_entries,
            evictions: AtomicU64::new(0),
        })
    }

    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> CacheBackend<K, V> for LruStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn get_entry(&self, key: &K) -> Option<CacheEntry<V>> {
        let mut inner = self.lock();
        let entry = inner.entries.get(key).cloned()?;
        inner.lru.touch(key);
        Some(entry)
    }

    fn put_entry(&self, key: K, entry: CacheEntry<V>) {
        let mut inner = self.lock();

        let is_overwrite = inner.entries.contains_key(&key);

        // If not overwriting and at capacity, evict oldest entry
        if !is_overwrite && inner.entries.len() >= self.max_entries {
            if let Some(evicted_key) = inner.lru.evict_oldest() {
                inner.entries.remove(&evicted_key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Evicted least recently used entry, {} entries remain",
                    inner.entries.len()
                );
            }
        }

        inner.lru.touch(&key);
        inner.entries.insert(key, entry);
    }

    fn remove_entry(&self, key: &K) -> Option<CacheEntry<V>> {
        let mut inner = self.lock();
        let removed = inner.entries.remove(key);
        if removed.is_some() {
            inner.lru.remove(key);
        }
        removed
    }

    fn remove_expired(&self, key: &K, now: Instant) -> bool {
        let mut inner = self.lock();
        let expired = inner
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now));

        if expired {
            inner.entries.remove(key);
            inner.lru.remove(key);
        }
        expired
    }

    fn size(&self) -> usize {
        self.lock().entries.len()
    }

    fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.lru.clear();
    }

    // == Purge Expired ==
    /// Removes all entries expired at `now` and returns the number removed.
    fn purge_expired(&self, now: Instant) -> usize {
        let mut inner = self.lock();

        let expired_keys: Vec<K> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            inner.entries.remove(key);
            inner.lru.remove(key);
        }

        expired_keys.len()
    }

    fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

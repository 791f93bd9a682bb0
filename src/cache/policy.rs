//! Cache Policy Module
//!
//! The expiration and retrieval policy layered over any [`CacheBackend`].
//! Every operation here funnels through the backend's primitives; the policy
//! never reaches into storage on its own.

use std::convert::Infallible;
use std::hash::Hash;
use std::time::Duration;

use tracing::{debug, trace};

use crate::cache::entry::deadline;
use crate::cache::flight::KeyLocks;
use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheBackend, CacheEntry, CacheStats, Clock, LruStore, SystemClock};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Lookup ==
/// Outcome of a side-effect-free read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    /// A valid entry was found
    Hit(V),
    /// An entry is stored but its deadline has passed
    Expired,
    /// Nothing is stored under the key
    Miss,
}

impl<V> Lookup<V> {
    /// Returns the value of a hit.
    pub fn into_value(self) -> Option<V> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Expired | Lookup::Miss => None,
        }
    }
}

// == Cache ==
/// A keyed cache with a default time-to-live and lazy expiration.
///
/// Expired entries are dropped the first time a read observes them;
/// nothing sweeps in the background. Capacity eviction is up to the backend,
/// [`LruStore`] by default.
///
/// # Concurrency
/// The cache adds no locking around storage; thread safety comes from the
/// backend. [`get_with`](Cache::get_with) and friends are not atomic: two
/// threads missing on the same key may both run their supplier, and the last
/// write wins. Use [`get_with_exclusive`](Cache::get_with_exclusive) when a
/// value must be computed at most once at a time per key.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use lru_ttl_cache::Cache;
///
/// let cache: Cache<&str, i32> = Cache::new(100, Duration::from_secs(60)).unwrap();
/// cache.put("answer", 42);
/// assert_eq!(cache.get(&"answer"), Some(42));
///
/// let value = cache.get_with("other", || 7);
/// assert_eq!(value, 7);
/// assert!(cache.contains(&"other"));
/// ```
#[derive(Debug)]
pub struct Cache<K, V, B = LruStore<K, V>, C = SystemClock> {
    backend: B,
    /// Default TTL for entries stored without an explicit one
    ttl: Duration,
    clock: C,
    stats: StatsRecorder,
    flights: KeyLocks<K>,
    _values: std::marker::PhantomData<fn() -> V>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates a cache backed by an [`LruStore`] of `max_entries` entries.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidArgument`] if `max_entries` or `ttl` is
    /// zero.
    pub fn new(max_entries: usize, ttl: Duration) -> Result<Self> {
        Self::with_backend(LruStore::new(max_entries)?, ttl)
    }

    /// Creates an [`LruStore`]-backed cache from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.max_entries, config.default_ttl())
    }
}

impl<K, V, B> Cache<K, V, B, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
    B: CacheBackend<K, V>,
{
    /// Creates a cache over a custom backend.
    pub fn with_backend(backend: B, ttl: Duration) -> Result<Self> {
        Self::with_clock(backend, ttl, SystemClock)
    }
}

impl<K, V, B, C> Cache<K, V, B, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    B: CacheBackend<K, V>,
    C: Clock,
{
    /// Creates a cache over a custom backend and time source.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidArgument`] if `ttl` is zero.
    pub fn with_clock(backend: B, ttl: Duration, clock: C) -> Result<Self> {
        if ttl.is_zero() {
            return Err(CacheError::InvalidArgument("ttl must be positive".to_string()));
        }

        debug!("Cache created with default TTL of {:?}", ttl);

        Ok(Self {
            backend,
            ttl,
            clock,
            stats: StatsRecorder::default(),
            flights: KeyLocks::new(),
            _values: std::marker::PhantomData,
        })
    }

    // == Lookup ==
    /// Reads `key` without removing anything.
    ///
    /// Still counts as an access for the backend's recency bookkeeping.
    pub fn lookup(&self, key: &K) -> Lookup<V> {
        match self.backend.get_entry(key) {
            None => Lookup::Miss,
            Some(entry) if entry.is_expired_at(self.clock.now()) => Lookup::Expired,
            Some(entry) => Lookup::Hit(entry.into_value()),
        }
    }

    // == Get ==
    /// Returns the value stored under `key` if it has not expired.
    ///
    /// An expired entry is removed from the backend as a side effect.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.lookup(key) {
            Lookup::Hit(value) => {
                self.stats.record_hit();
                Some(value)
            }
            Lookup::Expired => {
                self.stats.record_miss();
                // Only drop the entry if it is still the expired one
                if self.backend.remove_expired(key, self.clock.now()) {
                    self.stats.record_expirations(1);
                    debug!("Removed expired entry on read");
                }
                None
            }
            Lookup::Miss => {
                self.stats.record_miss();
                trace!("Cache miss");
                None
            }
        }
    }

    /// Returns true if `key` holds a value that has not expired.
    ///
    /// Goes through [`get`](Cache::get) rather than a raw existence check,
    /// so expired-but-unpurged entries report false (and get purged).
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    // == Put ==
    /// Stores `value` under `key` with the default TTL.
    ///
    /// Passing `None` is a no-op; absence is never cached.
    pub fn put(&self, key: K, value: impl Into<Option<V>>) {
        self.put_with_ttl(key, value, self.ttl);
    }

    /// Stores `value` under `key`, expiring `ttl` from now.
    ///
    /// Passing `None` is a no-op. A zero `ttl` stores an entry that is
    /// already expired.
    pub fn put_with_ttl(&self, key: K, value: impl Into<Option<V>>, ttl: Duration) {
        if let Some(value) = value.into() {
            let entry = CacheEntry::with_deadline(value, deadline(self.clock.now(), ttl));
            self.backend.put_entry(key, entry);
        }
    }

    // == Get Or Compute ==
    /// Returns the cached value for `key`, or computes, stores and returns it.
    ///
    /// `supplier` runs at most once per call and only on a miss.
    pub fn get_with(&self, key: K, supplier: impl FnOnce() -> V) -> V {
        self.get_with_ttl(key, supplier, self.ttl)
    }

    /// Like [`get_with`](Cache::get_with) with an explicit TTL for a
    /// computed value.
    pub fn get_with_ttl(&self, key: K, supplier: impl FnOnce() -> V, ttl: Duration) -> V {
        into_ok(self.try_get_with_ttl(key, || Ok::<_, Infallible>(supplier()), ttl))
    }

    /// Fallible get-or-compute.
    ///
    /// If `supplier` fails, its error is returned unchanged and nothing is
    /// stored.
    pub fn try_get_with<E>(
        &self,
        key: K,
        supplier: impl FnOnce() -> std::result::Result<V, E>,
    ) -> std::result::Result<V, E> {
        self.try_get_with_ttl(key, supplier, self.ttl)
    }

    /// Fallible get-or-compute with an explicit TTL for a computed value.
    pub fn try_get_with_ttl<E>(
        &self,
        key: K,
        supplier: impl FnOnce() -> std::result::Result<V, E>,
        ttl: Duration,
    ) -> std::result::Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = supplier()?;
        self.put_with_ttl(key, value.clone(), ttl);
        Ok(value)
    }

    /// Get-or-compute that runs at most one supplier at a time per key.
    ///
    /// Callers missing on the same key queue up; each re-checks the cache
    /// once it holds the key, so only the first runs its supplier while the
    /// value stays valid. A caller that waited is counted as a single miss.
    pub fn get_with_exclusive(&self, key: K, supplier: impl FnOnce() -> V) -> V {
        self.get_with_exclusive_ttl(key, supplier, self.ttl)
    }

    /// Like [`get_with_exclusive`](Cache::get_with_exclusive) with an
    /// explicit TTL for a computed value.
    pub fn get_with_exclusive_ttl(
        &self,
        key: K,
        supplier: impl FnOnce() -> V,
        ttl: Duration,
    ) -> V {
        into_ok(self.try_get_with_exclusive_ttl(key, || Ok::<_, Infallible>(supplier()), ttl))
    }

    /// Fallible form of [`get_with_exclusive`](Cache::get_with_exclusive).
    ///
    /// A failed supplier releases the key; the next waiter runs its own.
    pub fn try_get_with_exclusive<E>(
        &self,
        key: K,
        supplier: impl FnOnce() -> std::result::Result<V, E>,
    ) -> std::result::Result<V, E> {
        self.try_get_with_exclusive_ttl(key, supplier, self.ttl)
    }

    /// Fallible exclusive get-or-compute with an explicit TTL for a computed
    /// value.
    pub fn try_get_with_exclusive_ttl<E>(
        &self,
        key: K,
        supplier: impl FnOnce() -> std::result::Result<V, E>,
        ttl: Duration,
    ) -> std::result::Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let flight_key = key.clone();
        self.flights.run(&flight_key, || -> std::result::Result<V, E> {
            // Another caller may have stored the value while we waited. The
            // miss above already counted this call.
            if let Lookup::Hit(value) = self.lookup(&key) {
                return Ok(value);
            }
            let value = supplier()?;
            self.put_with_ttl(key, value.clone(), ttl);
            Ok(value)
        })
    }

    // == Removal ==
    /// Removes `key`. Returns true if an entry, valid or expired, was stored.
    pub fn remove(&self, key: &K) -> bool {
        self.backend.remove_entry(key).is_some()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.backend.clear();
    }

    /// Removes every entry that has expired and returns how many went.
    ///
    /// Runs only when called; expiration is otherwise lazy.
    pub fn purge_expired(&self) -> usize {
        let removed = self.backend.purge_expired(self.clock.now());
        if removed > 0 {
            self.stats.record_expirations(removed as u64);
            debug!("Purged {} expired entries", removed);
        }
        removed
    }

    // == Size ==
    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.backend.size()
    }

    /// Returns true if nothing is stored.
    ///
    /// Expired-but-unpurged entries count, so this can be false even when
    /// every stored entry is logically expired.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The default TTL fixed at construction.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Stats ==
    /// Snapshot of the counters; each read counts once as a hit or a miss.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.backend.evictions(), self.backend.size())
    }

    /// The underlying storage backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

fn into_ok<T>(result: std::result::Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

//! Integration Tests for the public cache API
//!
//! Exercises the cache end to end through the crate's public surface:
//! expiry over time, custom backends, and concurrent access.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::thread::sleep;
use std::time::{Duration, Instant};

use lru_ttl_cache::cache::{Lookup, ManualClock};
use lru_ttl_cache::{Cache, CacheBackend, CacheEntry, CacheError, Config, LruStore};

// == Helper Functions ==

type ManualCache = Cache<String, i32, LruStore<String, i32>, ManualClock>;

fn manual_cache(ttl: Duration) -> (ManualCache, ManualClock) {
    let clock = ManualClock::new();
    let cache = Cache::with_clock(LruStore::new(100).unwrap(), ttl, clock.clone()).unwrap();
    (cache, clock)
}

/// Single-threaded backend without recency tracking or capacity bound.
#[derive(Default)]
struct MapBackend {
    entries: RefCell<HashMap<String, CacheEntry<i32>>>,
    removals: Cell<usize>,
}

impl CacheBackend<String, i32> for MapBackend {
    fn get_entry(&self, key: &String) -> Option<CacheEntry<i32>> {
        self.entries.borrow().get(key).cloned()
    }

    fn put_entry(&self, key: String, entry: CacheEntry<i32>) {
        self.entries.borrow_mut().insert(key, entry);
    }

    fn remove_entry(&self, key: &String) -> Option<CacheEntry<i32>> {
        self.removals.set(self.removals.get() + 1);
        self.entries.borrow_mut().remove(key)
    }

    fn size(&self) -> usize {
        self.entries.borrow().len()
    }

    fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    fn purge_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }
}

// == Expiry Over Time ==

#[test]
fn test_end_to_end_expiry_timeline() {
    let (cache, clock) = manual_cache(Duration::from_millis(100));

    cache.put("a".to_string(), 1);

    clock.advance(Duration::from_millis(50));
    assert_eq!(cache.get(&"a".to_string()), Some(1));
    assert_eq!(cache.len(), 1);

    clock.advance(Duration::from_millis(100));
    assert_eq!(cache.get(&"a".to_string()), None);
    assert_eq!(cache.len(), 0);
    assert!(cache.is_empty());
}

#[test]
fn test_expiry_with_system_clock() {
    let cache: Cache<String, i32> = Cache::new(10, Duration::from_millis(200)).unwrap();

    cache.put("a".to_string(), 1);
    sleep(Duration::from_millis(20));
    assert_eq!(cache.get(&"a".to_string()), Some(1));

    sleep(Duration::from_millis(300));
    assert!(!cache.contains(&"a".to_string()));
    assert!(cache.is_empty());
}

#[test]
fn test_construction_rejects_zero_ttl() {
    let result: Result<Cache<String, i32>, CacheError> = Cache::new(10, Duration::ZERO);
    assert!(matches!(result, Err(CacheError::InvalidArgument(_))));

    let result: Result<Cache<String, i32, MapBackend>, CacheError> =
        Cache::with_backend(MapBackend::default(), Duration::ZERO);
    assert!(result.is_err());
}

#[test]
fn test_from_config() {
    let config = Config {
        max_entries: 2,
        default_ttl_ms: 1_000,
    };
    let cache: Cache<String, i32> = Cache::from_config(&config).unwrap();

    cache.put("a".to_string(), 1);
    cache.put("b".to_string(), 2);
    cache.put("c".to_string(), 3);

    assert_eq!(cache.ttl(), Duration::from_secs(1));
    assert_eq!(cache.len(), 2);
    assert!(!cache.contains(&"a".to_string()));
}

#[test]
fn test_from_config_rejects_zero_values() {
    let zero_ttl = Config {
        max_entries: 10,
        default_ttl_ms: 0,
    };
    let zero_capacity = Config {
        max_entries: 0,
        default_ttl_ms: 10,
    };

    assert!(Cache::<String, i32>::from_config(&zero_ttl).is_err());
    assert!(Cache::<String, i32>::from_config(&zero_capacity).is_err());
}

// == Get Or Compute ==

#[derive(Debug, PartialEq)]
enum FetchError {
    Unavailable,
}

#[test]
fn test_try_get_with_error_is_not_cached() {
    let (cache, _) = manual_cache(Duration::from_secs(1));

    let first = cache.try_get_with("user".to_string(), || Err(FetchError::Unavailable));
    assert_eq!(first, Err(FetchError::Unavailable));
    assert!(!cache.contains(&"user".to_string()));

    let second: Result<i32, FetchError> = cache.try_get_with("user".to_string(), || Ok(9));
    assert_eq!(second, Ok(9));
    assert_eq!(cache.get(&"user".to_string()), Some(9));
}

#[test]
fn test_get_with_value_readable_until_ttl() {
    let (cache, clock) = manual_cache(Duration::from_secs(1));

    assert_eq!(cache.get_with("k".to_string(), || 5), 5);
    clock.advance(Duration::from_millis(999));
    assert_eq!(cache.get(&"k".to_string()), Some(5));
    clock.advance(Duration::from_millis(1));
    assert_eq!(cache.get(&"k".to_string()), None);
}

// == Custom Backend ==

#[test]
fn test_custom_backend() {
    let clock = ManualClock::new();
    let cache: Cache<String, i32, MapBackend, ManualClock> =
        Cache::with_clock(MapBackend::default(), Duration::from_secs(1), clock.clone()).unwrap();

    cache.put("a".to_string(), 1);
    cache.put("b".to_string(), 2);
    assert_eq!(cache.lookup(&"a".to_string()), Lookup::Hit(1));

    clock.advance(Duration::from_secs(2));

    // Lookup reports the expiry without touching storage
    assert_eq!(cache.lookup(&"a".to_string()), Lookup::Expired);
    assert_eq!(cache.backend().removals.get(), 0);

    // Get purges through the backend's default remove_expired
    assert_eq!(cache.get(&"a".to_string()), None);
    assert_eq!(cache.backend().removals.get(), 1);
    assert_eq!(cache.len(), 1);

    assert_eq!(cache.purge_expired(), 1);
    assert!(cache.is_empty());
    assert_eq!(cache.stats().evictions, 0);
}

// == Concurrency ==

#[test]
fn test_concurrent_puts_and_gets() {
    let cache: Arc<Cache<String, i32>> =
        Arc::new(Cache::new(50, Duration::from_secs(60)).unwrap());

    let handles: Vec<_> = (0..8i32)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..200i32 {
                    let key = format!("key_{}", i % 80);
                    cache.put(key.clone(), worker * 1_000 + i);
                    if let Some(value) = cache.get(&key) {
                        // Any value read was written by some worker for this key
                        assert_eq!(value % 1_000 % 80, i % 80);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker should not panic");
    }

    assert!(cache.len() <= 50);
}

#[test]
fn test_get_with_exclusive_computes_once() {
    let cache: Arc<Cache<String, i32>> =
        Arc::new(Cache::new(10, Duration::from_secs(60)).unwrap());
    let calls = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.get_with_exclusive("shared".to_string(), || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    sleep(Duration::from_millis(20));
                    42
                })
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 42);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get(&"shared".to_string()), Some(42));
}

#[test]
fn test_get_with_race_still_converges() {
    let cache: Arc<Cache<String, i32>> =
        Arc::new(Cache::new(10, Duration::from_secs(60)).unwrap());
    let calls = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.get_with("raced".to_string(), || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    7
                })
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 7);
    }

    // Plain get-or-compute may run the supplier more than once
    let calls = calls.load(Ordering::SeqCst);
    assert!((1..=8).contains(&calls));
    assert_eq!(cache.len(), 1);
}

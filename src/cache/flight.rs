//! Per-key Exclusion Module
//!
//! Serializes get-or-compute calls that target the same key so a value is
//! computed at most once at a time per key.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Slot = Arc<Mutex<()>>;

// == Key Locks ==
/// Lazily created mutex per key.
///
/// A slot lives in the map only while at least one caller is running or
/// waiting on it.
#[derive(Debug)]
pub(crate) struct KeyLocks<K> {
    slots: Mutex<HashMap<K, Slot>>,
}

impl<K> KeyLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `f` while holding the lock for `key`.
    ///
    /// Callers for other keys are not blocked. The slot is released even if
    /// `f` panics.
    pub(crate) fn run<T>(&self, key: &K, f: impl FnOnce() -> T) -> T {
        let release = Release {
            locks: self,
            key,
            slot: Some(self.acquire(key)),
        };
        let _guard = release
            .slot
            .as_ref()
            .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner));
        f()
    }

    /// Number of keys with a live slot.
    #[cfg(test)]
    pub(crate) fn active(&self) -> usize {
        self.lock_slots().len()
    }

    fn acquire(&self, key: &K) -> Slot {
        let mut slots = self.lock_slots();
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<K, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Release<'a, K>
where
    K: Eq + Hash + Clone,
{
    locks: &'a KeyLocks<K>,
    key: &'a K,
    /// This caller's reference, given back under the map lock
    slot: Option<Slot>,
}

impl<K> Drop for Release<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        let mut slots = self.locks.lock_slots();
        drop(self.slot.take());
        // Only the map's reference left means nobody is running or waiting
        if slots
            .get(self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(self.key);
        }
    }
}

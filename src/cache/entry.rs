//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A cached value paired with the instant it stops being valid.
///
/// Entries are immutable once built. An entry is valid while the current
/// time is strictly before its deadline; an expired entry never hands out
/// its value.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    value: V,
    /// Absolute deadline, None = not representable (never expires)
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry that expires `ttl` from now.
    ///
    /// The TTL is not validated: a zero TTL produces an entry that is
    /// already expired.
    pub fn new(value: V, ttl: Duration) -> Self {
        Self::with_deadline(value, deadline(Instant::now(), ttl))
    }

    /// Creates a cache entry with an explicit deadline.
    pub fn with_deadline(value: V, expires_at: Option<Instant>) -> Self {
        Self { value, expires_at }
    }

    // == Value ==
    /// Returns the value if the entry is still valid against the system clock.
    pub fn value(&self) -> Option<&V> {
        self.value_at(Instant::now())
    }

    /// Returns the value if the entry is still valid at `now`.
    pub fn value_at(&self, now: Instant) -> Option<&V> {
        if self.is_expired_at(now) {
            None
        } else {
            Some(&self.value)
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: the entry is expired once `now` reaches the
    /// deadline, so a TTL that has fully elapsed is never served.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Returns the absolute deadline, or None if the entry never expires.
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    // == Time To Live ==
    /// Returns the time left before expiry at `now`.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has not expired yet
    /// - `None` if the entry never expires
    pub fn ttl_remaining_at(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }

    /// Consumes the entry and returns the value regardless of validity.
    pub fn into_value(self) -> V {
        self.value
    }
}

// == Utility Functions ==
/// Computes the deadline `ttl` after `now`.
///
/// Returns None when the sum overflows the platform's `Instant`.
pub(crate) fn deadline(now: Instant, ttl: Duration) -> Option<Instant> {
    now.checked_add(ttl)
}

//! LRU TTL Cache - A generic in-process cache
//!
//! Size-bounded storage with least-recently-used eviction and per-entry
//! time-to-live expiration. Expired entries are removed lazily, the first
//! time a read observes them.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{Cache, CacheBackend, CacheEntry, CacheStats, LruStore};
pub use config::Config;
pub use error::{CacheError, Result};

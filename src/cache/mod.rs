//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and LRU eviction.

mod backend;
mod clock;
mod entry;
mod flight;
mod lru;
mod policy;
mod stats;
mod store;


// Re-export public types
pub use backend::CacheBackend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use policy::{Cache, Lookup};
pub use stats::CacheStats;
pub use store::LruStore;

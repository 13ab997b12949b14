//! Cache Module
//!
//! Provides a concurrent in-memory cache with LRU eviction and
//! expire-after-access/write timers.

mod clock;
mod entry;
mod expiry;
mod lru;
mod segments;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, MonotonicClock};
pub(crate) use entry::{Entry, Link};
pub(crate) use expiry::ExpirationPolicy;
pub(crate) use lru::NodeId;
pub(crate) use lru::RecencyList;
pub(crate) use segments::SegmentedMap;
pub use stats::CacheStats;
pub(crate) use stats::StatsCounter;
pub use store::{CacheConfig, CacheStore, DEFAULT_MAX_ENTRIES, DEFAULT_SEGMENTS};

// == Public Constants ==
/// Maximum allowed key length in bytes accepted by the HTTP layer
pub const MAX_KEY_LENGTH: usize = 256;

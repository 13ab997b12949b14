//! Segmented LRU - a concurrent in-process cache
//!
//! Provides a bounded key/value cache with least-recently-used eviction,
//! expire-after-access/write timers and a sharded map for concurrent access,
//! plus a small HTTP service exposing it.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheConfig, CacheStats, CacheStore};
pub use config::Config;
pub use error::CacheError;
pub use tasks::spawn_cleanup_task;

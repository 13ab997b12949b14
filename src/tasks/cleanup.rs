//! Expiry Cleanup Task
//!
//! Background task that periodically prunes expired entries from the cache
//! tail, so idle caches release stale values without waiting for a write.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::SharedCache;

/// Spawns a background task that periodically calls [`CacheStore::refresh`].
///
/// The cache locks internally, so the task never holds anything across an
/// await point.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// [`CacheStore::refresh`]: crate::cache::CacheStore::refresh
pub fn spawn_cleanup_task(cache: SharedCache, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?interval, "Starting expiry cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.refresh();

            if removed > 0 {
                info!("Expiry cleanup: removed {} expired entries", removed);
            } else {
                debug!("Expiry cleanup: no expired entries found");
            }
        }
    })
}

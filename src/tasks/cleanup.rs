//! Expiry Sweep Task
//!
//! Background task that periodically sweeps expired entries from the file tier.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that runs [`CacheStore::cleanup`] on an interval.
///
/// The first sweep happens one interval after spawning. Abort the returned
/// handle to stop the task.
///
/// # Example
/// ```ignore
/// let store = Arc::new(CacheStore::open(CacheConfig::from_env()).await?);
/// let cleanup_handle = spawn_cleanup_task(store.clone(), 3600);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(store: Arc<CacheStore>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    spawn_with_interval(store, Duration::from_secs(cleanup_interval_secs))
}

fn spawn_with_interval(store: Arc<CacheStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting cache sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.cleanup().await;
            if removed > 0 {
                info!("Cache sweep: removed {} expired entries", removed);
            } else {
                debug!("Cache sweep: no expired entries found");
            }
        }
    })
}

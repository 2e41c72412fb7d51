//! TTL Sweeper Task
//!
//! Background task that periodically removes expired entries from an
//! in-process store.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that periodically sweeps expired entries.
///
/// The task holds only a weak reference to the store and exits on its own
/// once the store has been dropped. Aborting the returned handle stops it
/// earlier.
///
/// # Arguments
/// * `store` - Shared store to sweep
/// * `interval` - Pause between sweeps; bounds how long an expired entry
///   can linger when nothing reads it
///
/// # Example
/// ```ignore
/// let store = Arc::new(RwLock::new(CacheStore::new()));
/// let handle = spawn_cleanup_task(&store, Duration::from_secs(1));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task(store: &Arc<RwLock<CacheStore>>, interval: Duration) -> JoinHandle<()> {
    let store: Weak<RwLock<CacheStore>> = Arc::downgrade(store);

    tokio::spawn(async move {
        info!("Starting TTL sweeper with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let Some(store) = store.upgrade() else {
                debug!("TTL sweeper: store dropped, stopping");
                break;
            };

            let removed = {
                let mut guard = store.write().await;
                guard.cleanup_expired()
            };

            if removed > 0 {
                info!("TTL sweeper: removed {} expired entries", removed);
            } else {
                debug!("TTL sweeper: no expired entries found");
            }
        }
    })
}

//! In-process cache provider
//!
//! Stores payloads in a shared `CacheStore`. Expiry is checked lazily on
//! every read, and a sweeper task removes expired entries in the background.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheStats, CacheStore};
use crate::error::Result;
use crate::provider::{
    CacheProvider, Payload, PipelineCommand, PipelineReply, SerializationOptions,
};
use crate::tasks::spawn_cleanup_task;

/// Default pause between sweeps
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

// == Config ==
/// Options for [`MemoryCacheProvider`].
#[derive(Debug, Clone)]
pub struct MemoryProviderConfig {
    /// Sweeper interval; `None` relies on lazy expiry alone
    pub cleanup_interval: Option<Duration>,
    /// Keep structured values as-is instead of serializing them to text
    pub stores_as_obj: bool,
    /// Hooks used when values are stored as text
    pub serialization: SerializationOptions,
}

impl Default for MemoryProviderConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Some(DEFAULT_CLEANUP_INTERVAL),
            stores_as_obj: true,
            serialization: SerializationOptions::default(),
        }
    }
}

impl MemoryProviderConfig {
    /// Text-storing configuration using the given hooks.
    pub fn serialized(serialization: SerializationOptions) -> Self {
        Self {
            stores_as_obj: false,
            serialization,
            ..Self::default()
        }
    }

    pub fn with_cleanup_interval(mut self, interval: Option<Duration>) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

// == Memory Cache Provider ==
/// In-process provider backed by a lock-guarded map.
pub struct MemoryCacheProvider {
    store: Arc<RwLock<CacheStore>>,
    config: MemoryProviderConfig,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryCacheProvider {
    // == Constructor ==
    /// Creates a provider and, when called inside a Tokio runtime with a
    /// cleanup interval configured, starts its sweeper.
    pub fn new(config: MemoryProviderConfig) -> Self {
        let store = Arc::new(RwLock::new(CacheStore::new()));

        let sweeper = match config.cleanup_interval {
            Some(interval) if tokio::runtime::Handle::try_current().is_ok() => {
                Some(spawn_cleanup_task(&store, interval))
            }
            Some(_) => {
                debug!("No Tokio runtime available, memory provider relies on lazy expiry");
                None
            }
            None => None,
        };

        info!(
            "Memory cache provider initialized (stores_as_obj={}, sweeper={})",
            config.stores_as_obj,
            sweeper.is_some()
        );

        Self {
            store,
            config,
            sweeper: Mutex::new(sweeper),
        }
    }

    /// Provider holding structured values, swept every second.
    pub fn with_defaults() -> Self {
        Self::new(MemoryProviderConfig::default())
    }

    // == Maintenance ==
    /// Current store statistics.
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Removes every entry, returning how many there were.
    pub async fn flushdb(&self) -> u64 {
        self.store.write().await.clear() as u64
    }

    /// Stops the sweeper. Reads keep expiring entries lazily.
    pub fn shutdown(&self) {
        if let Ok(mut sweeper) = self.sweeper.lock() {
            if let Some(handle) = sweeper.take() {
                handle.abort();
                info!("Memory provider sweeper stopped");
            }
        }
    }

    /// Whether the sweeper task is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .map(|sweeper| sweeper.as_ref().map_or(false, |h| !h.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for MemoryCacheProvider {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn stores_as_obj(&self) -> bool {
        self.config.stores_as_obj
    }

    fn serialization_options(&self) -> SerializationOptions {
        self.config.serialization.clone()
    }

    async fn get(&self, key: &str) -> Result<Option<Payload>> {
        Ok(self.store.write().await.get(key))
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Payload>>> {
        let mut store = self.store.write().await;
        Ok(keys.iter().map(|key| store.get(key)).collect())
    }

    async fn set(&self, key: &str, payload: Payload, ttl: Option<u64>) -> Result<()> {
        self.store.write().await.set(key.to_string(), payload, ttl);
        Ok(())
    }

    async fn mset(&self, entries: Vec<(String, Payload)>) -> Result<()> {
        let mut store = self.store.write().await;
        for (key, payload) in entries {
            store.set(key, payload, None);
        }
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let mut store = self.store.write().await;
        Ok(keys.iter().filter(|key| store.delete(key)).count() as u64)
    }

    async fn expire(&self, key: &str, ttl: u64) -> Result<bool> {
        Ok(self.store.write().await.expire(key, ttl))
    }

    async fn exec_pipeline(&self, commands: Vec<PipelineCommand>) -> Result<Vec<PipelineReply>> {
        debug!("Executing {} pipelined commands in memory", commands.len());

        // One lock for the whole batch, so no other task interleaves
        let mut store = self.store.write().await;
        let replies = commands
            .into_iter()
            .map(|command| match command {
                PipelineCommand::Get(key) => PipelineReply::Value(store.get(&key)),
                PipelineCommand::Set { key, payload, ttl } => {
                    store.set(key, payload, ttl);
                    PipelineReply::Ok
                }
                PipelineCommand::Del(key) => PipelineReply::Removed(u64::from(store.delete(&key))),
                PipelineCommand::Expire { key, ttl } => PipelineReply::Applied(store.expire(&key, ttl)),
            })
            .collect();

        Ok(replies)
    }
}

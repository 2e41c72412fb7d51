//! Provider Module
//!
//! The storage contract consumed by the memoization engine, and the
//! backends that implement it.
//!
//! # Backends
//! - `MemoryCacheProvider`: in-process map with lazy expiry and a sweeper task
//! - `RedisCacheProvider`: networked store over a multiplexed connection
//! - `DisabledCacheProvider`: stores nothing, every read misses

mod disabled;
mod memory;
mod pipeline;
mod redis;
mod serialization;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use self::disabled::DisabledCacheProvider;
pub use self::memory::{MemoryCacheProvider, MemoryProviderConfig};
pub use self::pipeline::{Pipeline, PipelineCommand, PipelineReply};
pub use self::redis::RedisCacheProvider;
pub use self::serialization::{SerializationOptions, TransformHook};

// == Payload ==
/// What a provider stores under a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Structured value, for providers that store objects natively
    Object(Value),
    /// Serialized text, for providers that only store strings
    Text(String),
}

// == Cache Provider Trait ==
/// Uniform async key/value surface with TTL support.
///
/// TTLs are in seconds. `Some(0)` and `None` both mean "no expiry" when
/// writing; `expire(key, 0)` expires the entry immediately.
///
/// Errors are returned as-is to the caller; the engine never retries.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Backend name, for logging
    fn name(&self) -> &'static str;

    /// Whether `Payload::Object` values are stored without serialization.
    fn stores_as_obj(&self) -> bool {
        false
    }

    /// Hooks used to marshal values into `Payload::Text`.
    fn serialization_options(&self) -> SerializationOptions {
        SerializationOptions::default()
    }

    async fn get(&self, key: &str) -> Result<Option<Payload>>;

    /// Reads several keys; the result has one slot per key, in order.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Payload>>>;

    async fn set(&self, key: &str, payload: Payload, ttl: Option<u64>) -> Result<()>;

    /// Writes several entries without expiry.
    async fn mset(&self, entries: Vec<(String, Payload)>) -> Result<()>;

    /// Removes keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// Resets the TTL of a live entry. Returns false if the key is absent.
    async fn expire(&self, key: &str, ttl: u64) -> Result<bool>;

    /// Executes queued commands, replying in queue order.
    async fn exec_pipeline(&self, commands: Vec<PipelineCommand>) -> Result<Vec<PipelineReply>>;
}

impl dyn CacheProvider {
    /// Starts a command batch against this provider.
    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(self)
    }
}

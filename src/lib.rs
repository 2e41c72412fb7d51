//! Memocache - memoization for async functions
//!
//! Caches function results under deterministic keys derived from their
//! arguments, on pluggable storage backends with TTL expiration.

pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod memoize;
pub mod provider;
pub mod tasks;

pub use config::Config;
pub use error::{CacheError, MemoizeError};
pub use key::{ArgValue, CacheArg, CacheArgs, CacheKey, CacheKeyGenerator, ObjectFingerprint};
pub use memoize::{CachedItem, Memoize, MemoizeConfig};
pub use provider::{
    CacheProvider, DisabledCacheProvider, MemoryCacheProvider, MemoryProviderConfig, Payload,
    RedisCacheProvider, SerializationOptions,
};
pub use tasks::spawn_cleanup_task;

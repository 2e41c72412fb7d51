//! Memoize Engine
//!
//! Wraps an async function so its results are cached under keys derived
//! from its arguments.
//!
//! ## Behaviour
//! - `call` reads through the cache and persists whatever the function
//!   returns, failures included
//! - `multi_call` reads a whole batch with one `MGET`, computes the misses and
//!   writes them back in one pipeline, but never caches a failed batch
//! - `exec`/`multi_exec` bypass the cache entirely

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{CacheError, MemoizeError, Result};
use crate::key::{CacheArgs, CacheKey, CacheKeyGenerator};
use crate::memoize::config::{MemoizeConfig, MultiExecFn};
use crate::memoize::item::{decode, encode, CachedItem};
use crate::provider::CacheProvider;

/// The wrapped computation.
pub type MemoizedFn<A, T, E> = Arc<dyn Fn(A) -> BoxFuture<'static, std::result::Result<T, E>> + Send + Sync>;

// == Memoize ==
/// A memoized async function.
///
/// `A` is the argument tuple, `T` the success type and `E` the failure type.
/// Both outcomes are stored through serde, so a cached failure comes back
/// as the same `E` on later calls.
pub struct Memoize<A, T, E> {
    function: MemoizedFn<A, T, E>,
    key_generator: CacheKeyGenerator,
    provider: Arc<dyn CacheProvider>,
    ttl: u64,
    multi_exec_override: Option<MultiExecFn<A, T, E>>,
}

impl<A, T, E> Memoize<A, T, E>
where
    A: CacheArgs + Send + 'static,
    T: Serialize + DeserializeOwned + Send + 'static,
    E: Serialize + DeserializeOwned + Send + 'static,
{
    // == Constructor ==
    /// Wraps `function` under `name`, which namespaces its keys.
    ///
    /// `ttl` is in seconds and applies to every write; 0 stores entries
    /// without expiry.
    pub fn new<F, Fut>(name: impl Into<String>, function: F, ttl: u64, config: MemoizeConfig<A, T, E>) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        let key_generator = CacheKeyGenerator::new(name, config.args_order_vain)
            .with_object_fingerprint(config.object_fingerprint);

        debug!(
            "Memoizing {} on {} provider (ttl={}s)",
            key_generator.function_name(),
            config.cache_provider.name(),
            ttl
        );

        Self {
            function: Arc::new(move |args| function(args).boxed()),
            key_generator,
            provider: config.cache_provider,
            ttl,
            multi_exec_override: config.multi_exec_override,
        }
    }

    pub fn name(&self) -> &str {
        self.key_generator.function_name()
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    pub fn provider(&self) -> &Arc<dyn CacheProvider> {
        &self.provider
    }

    /// Cache key for an argument tuple.
    pub fn key_for(&self, args: &A) -> CacheKey {
        self.key_generator.key_for(args)
    }

    // == Single Calls ==
    /// Returns the cached outcome for `args`, computing and caching it on a miss.
    ///
    /// A failure is cached like a value and replayed as
    /// [`MemoizeError::Rejected`] until the entry expires.
    pub async fn call(&self, args: A) -> std::result::Result<T, MemoizeError<E>> {
        let key = self.key_for(&args);

        if let Some(payload) = self.provider.get(key.as_str()).await? {
            debug!("Cache hit for {}", key);
            return match decode(self.provider.as_ref(), payload)?.resolve::<T, E>()? {
                Ok(value) => Ok(value),
                Err(reason) => Err(MemoizeError::Rejected(reason)),
            };
        }

        debug!("Cache miss for {}, computing", key);
        match (self.function)(args).await {
            Ok(value) => {
                self.store(&key, &CachedItem::resolved(&value)).await?;
                Ok(value)
            }
            Err(reason) => {
                self.store(&key, &CachedItem::rejected(&reason)).await?;
                Err(MemoizeError::Rejected(reason))
            }
        }
    }

    /// Invokes the function without touching the cache.
    pub async fn exec(&self, args: A) -> std::result::Result<T, MemoizeError<E>> {
        (self.function)(args).await.map_err(MemoizeError::Rejected)
    }

    /// Stores `value` as the result for `args` without invoking the function.
    pub async fn update(&self, args: &A, value: &T) -> Result<()> {
        let key = self.key_for(args);
        self.store(&key, &CachedItem::resolved(value)).await
    }

    /// Removes the cached outcome for `args`, returning how many keys were deleted.
    pub async fn demoize(&self, args: &A) -> Result<u64> {
        let key = self.key_for(args);
        let removed = self.provider.del(&[key.to_string()]).await?;
        debug!("Demoized {} ({} removed)", key, removed);
        Ok(removed)
    }

    /// Recomputes the result for `args` and caches it.
    ///
    /// A failure is returned without being cached, so the previous entry,
    /// if any, stays in place.
    pub async fn refresh(&self, args: A) -> std::result::Result<T, MemoizeError<E>> {
        let key = self.key_for(&args);
        let value = self.exec(args).await?;
        self.store(&key, &CachedItem::resolved(&value)).await?;
        debug!("Refreshed {}", key);
        Ok(value)
    }

    /// Changes the remaining lifetime of the entry for `args`.
    ///
    /// Returns false when there is no entry to update.
    pub async fn set_exp(&self, args: &A, ttl: u64) -> Result<bool> {
        let key = self.key_for(args);
        self.provider.expire(key.as_str(), ttl).await
    }

    // == Batches ==
    /// Batched `call`: results come back in input order.
    ///
    /// Hits are read with one `MGET`; misses are computed together and
    /// written back in one pipeline. A cached failure among the hits, or a
    /// failure while computing the misses, fails the whole batch and nothing
    /// new is written.
    pub async fn multi_call(&self, args_list: Vec<A>) -> std::result::Result<Vec<T>, MemoizeError<E>> {
        if args_list.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = args_list
            .iter()
            .map(|args| self.key_for(args).into_string())
            .collect();

        let cached = self.provider.mget(&keys).await?;
        if cached.len() != keys.len() {
            return Err(CacheError::UnexpectedReply(format!(
                "MGET of {} keys returned {} values",
                keys.len(),
                cached.len()
            ))
            .into());
        }

        let mut results: Vec<Option<T>> = Vec::with_capacity(keys.len());
        let mut missing_at = Vec::new();
        let mut missing_args = Vec::new();

        for (args, payload) in args_list.into_iter().zip(cached) {
            match payload {
                Some(payload) => match decode(self.provider.as_ref(), payload)?.resolve::<T, E>()? {
                    Ok(value) => results.push(Some(value)),
                    Err(reason) => return Err(MemoizeError::Rejected(reason)),
                },
                None => {
                    missing_at.push(results.len());
                    missing_args.push(args);
                    results.push(None);
                }
            }
        }

        debug!(
            "Batch for {}: {} hits, {} misses",
            self.name(),
            results.len() - missing_at.len(),
            missing_at.len()
        );

        if !missing_args.is_empty() {
            let computed = self.compute_batch(missing_args).await?;

            let mut pipeline = self.provider.pipeline();
            for (index, value) in missing_at.iter().zip(&computed) {
                let payload = encode(self.provider.as_ref(), &CachedItem::resolved(value))?;
                pipeline = pipeline.set(keys[*index].clone(), payload, Some(self.ttl));
            }
            pipeline.exec().await?;

            for (index, value) in missing_at.into_iter().zip(computed) {
                results[index] = Some(value);
            }
        }

        results
            .into_iter()
            .collect::<Option<Vec<T>>>()
            .ok_or_else(|| CacheError::UnexpectedReply("batch left a slot unfilled".to_string()).into())
    }

    /// Batched `exec`: computes every tuple without touching the cache.
    pub async fn multi_exec(&self, args_list: Vec<A>) -> std::result::Result<Vec<T>, MemoizeError<E>> {
        if args_list.is_empty() {
            return Ok(Vec::new());
        }
        self.compute_batch(args_list).await
    }

    /// Runs the override when configured, otherwise one call per tuple
    /// concurrently.
    async fn compute_batch(&self, args_list: Vec<A>) -> std::result::Result<Vec<T>, MemoizeError<E>> {
        let expected = args_list.len();

        let values = match &self.multi_exec_override {
            Some(batch) => batch(args_list).await.map_err(MemoizeError::Rejected)?,
            None => try_join_all(args_list.into_iter().map(|args| (self.function)(args)))
                .await
                .map_err(MemoizeError::Rejected)?,
        };

        if values.len() != expected {
            warn!(
                "Batch override for {} returned {} results for {} inputs",
                self.name(),
                values.len(),
                expected
            );
            return Err(CacheError::BatchLength {
                expected,
                actual: values.len(),
            }
            .into());
        }

        Ok(values)
    }

    async fn store<D: Serialize>(&self, key: &CacheKey, item: &CachedItem<D>) -> Result<()> {
        let payload = encode(self.provider.as_ref(), item)?;
        self.provider.set(key.as_str(), payload, Some(self.ttl)).await
    }
}

impl<A, T, E> Clone for Memoize<A, T, E> {
    fn clone(&self) -> Self {
        Self {
            function: Arc::clone(&self.function),
            key_generator: self.key_generator.clone(),
            provider: Arc::clone(&self.provider),
            ttl: self.ttl,
            multi_exec_override: self.multi_exec_override.clone(),
        }
    }
}

impl<A, T, E> fmt::Debug for Memoize<A, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoize")
            .field("name", &self.key_generator.function_name())
            .field("provider", &self.provider.name())
            .field("ttl", &self.ttl)
            .field("args_order_vain", &self.key_generator.args_order_vain())
            .finish()
    }
}

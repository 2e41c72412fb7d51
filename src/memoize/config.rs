//! Memoize Configuration
//!
//! Construction options for a [`Memoize`](crate::memoize::Memoize) instance.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::key::ObjectFingerprint;
use crate::provider::CacheProvider;

/// Batched replacement for per-tuple invocation in `multi_exec`/`multi_call`.
pub type MultiExecFn<A, T, E> =
    Arc<dyn Fn(Vec<A>) -> BoxFuture<'static, Result<Vec<T>, E>> + Send + Sync>;

// == Memoize Config ==
/// Options for a memoized function.
///
/// # Defaults
/// - `args_order_vain`: false, argument order is part of the key
/// - `object_fingerprint`: [`ObjectFingerprint::Values`]
/// - `multi_exec_override`: none, missing tuples are computed one call each
pub struct MemoizeConfig<A, T, E> {
    pub(crate) cache_provider: Arc<dyn CacheProvider>,
    pub(crate) args_order_vain: bool,
    pub(crate) object_fingerprint: ObjectFingerprint,
    pub(crate) multi_exec_override: Option<MultiExecFn<A, T, E>>,
}

impl<A, T, E> MemoizeConfig<A, T, E> {
    pub fn new(cache_provider: Arc<dyn CacheProvider>) -> Self {
        Self {
            cache_provider,
            args_order_vain: false,
            object_fingerprint: ObjectFingerprint::default(),
            multi_exec_override: None,
        }
    }

    /// Makes argument order irrelevant to the cache key.
    pub fn args_order_vain(mut self, args_order_vain: bool) -> Self {
        self.args_order_vain = args_order_vain;
        self
    }

    /// Chooses how object arguments contribute to the cache key.
    pub fn object_fingerprint(mut self, mode: ObjectFingerprint) -> Self {
        self.object_fingerprint = mode;
        self
    }

    /// Computes batches with a single call instead of one call per tuple.
    ///
    /// The override receives the argument tuples in order and must return
    /// one result per tuple, in the same order.
    pub fn multi_exec_override<F, Fut>(mut self, batch: F) -> Self
    where
        F: Fn(Vec<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
    {
        self.multi_exec_override = Some(Arc::new(move |args| batch(args).boxed()));
        self
    }
}

impl<A, T, E> fmt::Debug for MemoizeConfig<A, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizeConfig")
            .field("cache_provider", &self.cache_provider.name())
            .field("args_order_vain", &self.args_order_vain)
            .field("object_fingerprint", &self.object_fingerprint)
            .field("multi_exec_override", &self.multi_exec_override.is_some())
            .finish()
    }
}

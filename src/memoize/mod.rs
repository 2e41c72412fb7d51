//! Memoization
//!
//! Caches the outcome of async functions through any [`CacheProvider`](crate::provider::CacheProvider).

mod config;
mod engine;
mod item;

pub use config::{MemoizeConfig, MultiExecFn};
pub use engine::{Memoize, MemoizedFn};
pub use item::CachedItem;

//! Configuration Module
//!
//! Loads the defaults used by the demo binary from environment variables.

use std::env;
use std::time::Duration;

/// Runtime configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// TTL in seconds applied to memoized results
    pub default_ttl: u64,
    /// Memory provider sweep frequency in seconds; 0 disables the sweeper
    pub cleanup_interval: u64,
    /// Whether argument order is ignored when building cache keys
    pub args_order_vain: bool,
    /// Redis connection URL; the memory provider is used when unset
    pub redis_url: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMOCACHE_DEFAULT_TTL` - TTL in seconds (default: 300)
    /// - `MEMOCACHE_CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1)
    /// - `MEMOCACHE_ARGS_ORDER_VAIN` - `true`/`1` to ignore argument order (default: false)
    /// - `REDIS_URL` - e.g. `redis://127.0.0.1:6379` (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env::var("MEMOCACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl),
            cleanup_interval: env::var("MEMOCACHE_CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
            args_order_vain: env::var("MEMOCACHE_ARGS_ORDER_VAIN")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.args_order_vain),
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
        }
    }

    /// Sweeper interval for the memory provider.
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval > 0).then(|| Duration::from_secs(self.cleanup_interval))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: 300,
            cleanup_interval: 1,
            args_order_vain: false,
            redis_url: None,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

//! Cache Entry Module
//!
//! Defines the structure for individual in-process entries with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::provider::Payload;

// == Cache Entry ==
/// Represents a single stored payload with expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload
    pub value: Payload,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry with optional TTL.
    ///
    /// # Arguments
    /// * `value` - The payload to store
    /// * `ttl_seconds` - TTL in seconds; `None` or `Some(0)` never expires
    pub fn new(value: Payload, ttl_seconds: Option<u64>) -> Self {
        let now = current_timestamp_ms();
        let expires_at = ttl_seconds
            .filter(|ttl| *ttl > 0)
            .map(|ttl| expiry_ms(now, ttl));

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Checks expiry against a given timestamp.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Expire ==
    /// Resets the expiration to `ttl_seconds` from now. Zero expires the
    /// entry immediately.
    pub fn expire_in(&mut self, ttl_seconds: u64) {
        self.expires_at = Some(expiry_ms(current_timestamp_ms(), ttl_seconds));
    }
}

/// Expiration timestamp `ttl_seconds` after `now_ms`, clamped to `u64::MAX`.
fn expiry_ms(now_ms: u64, ttl_seconds: u64) -> u64 {
    now_ms.saturating_add(ttl_seconds.saturating_mul(1000))
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

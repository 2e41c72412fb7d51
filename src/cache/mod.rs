//! Cache Module
//!
//! In-process storage backing the memory provider: TTL-stamped entries,
//! lazy expiry on read, and hit/miss statistics.

mod entry;
mod stats;
mod store;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use stats::CacheStats;
pub use store::CacheStore;

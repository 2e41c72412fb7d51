//! Key Module
//!
//! Deterministic cache-key derivation from heterogeneous argument lists.

mod arg;
mod fingerprint;
mod generator;


// Re-export public types
pub use arg::{ArgValue, CacheArg, CacheArgs};
pub use fingerprint::{Fingerprint, ObjectFingerprint, NULL_SENTINEL, UNDEFINED_SENTINEL};
pub use generator::{CacheKey, CacheKeyGenerator};

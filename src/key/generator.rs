//! Cache Key Generator
//!
//! Derives stable cache keys from a function identity and its arguments.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::key::{ArgValue, CacheArgs, Fingerprint, ObjectFingerprint};

// == Cache Key ==
/// Opaque cache key of the form `{function_name}:<sha256 hex>`.
///
/// The braces form a Redis Cluster hash tag, so every key of one function
/// lands in the same slot and can be read back with a single `MGET`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

// == Cache Key Generator ==
/// Turns argument lists into cache keys for one function.
///
/// Generation is pure and synchronous; a generator can be shared freely
/// between tasks.
#[derive(Debug, Clone)]
pub struct CacheKeyGenerator {
    function_name: String,
    args_order_vain: bool,
    object_fingerprint: ObjectFingerprint,
}

impl CacheKeyGenerator {
    // == Constructor ==
    /// Creates a generator for `function_name`.
    ///
    /// # Arguments
    /// * `function_name` - Identity of the memoized function, part of every key
    /// * `args_order_vain` - When true, argument order does not affect the key
    pub fn new(function_name: impl Into<String>, args_order_vain: bool) -> Self {
        Self {
            function_name: function_name.into(),
            args_order_vain,
            object_fingerprint: ObjectFingerprint::default(),
        }
    }

    /// Sets how object arguments are fingerprinted.
    pub fn with_object_fingerprint(mut self, mode: ObjectFingerprint) -> Self {
        self.object_fingerprint = mode;
        self
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn args_order_vain(&self) -> bool {
        self.args_order_vain
    }

    // == Key Derivation ==
    /// Derives the key for an argument list.
    pub fn key_for<A: CacheArgs + ?Sized>(&self, args: &A) -> CacheKey {
        self.key_for_values(&args.cache_args())
    }

    /// Derives the key for already converted argument values.
    pub fn key_for_values(&self, args: &[ArgValue]) -> CacheKey {
        let mut hasher = Sha256::new();
        Fingerprint::Text(self.function_name.clone()).feed(&mut hasher);
        for part in self.fingerprint(args) {
            part.feed(&mut hasher);
        }
        let digest = hex::encode(hasher.finalize());

        CacheKey(format!("{{{}}}:{}", self.function_name, digest))
    }

    /// Flattened fingerprint of an argument list, sorted when argument
    /// order is irrelevant.
    ///
    /// Sorting is by textual form; parts with equal text (`5` and an epoch
    /// of 5) are tie-broken structurally so the result never depends on the
    /// input order.
    pub fn fingerprint(&self, args: &[ArgValue]) -> Vec<Fingerprint> {
        let mut parts = Fingerprint::of_all(args, self.object_fingerprint);
        if self.args_order_vain {
            parts.sort_by_cached_key(|part| (part.sort_text(), part.clone()));
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_key_is_deterministic() {
        let gen = CacheKeyGenerator::new("compute_sum", false);
        assert_eq!(gen.key_for(&(1, 2, 3)), gen.key_for(&(1, 2, 3)));
    }

    #[test]
    fn test_key_format() {
        let gen = CacheKeyGenerator::new("compute_sum", false);
        let key = gen.key_for(&(1, 2, 3));
        let (prefix, digest) = key.as_str().split_once(':').unwrap();

        assert_eq!(prefix, "{compute_sum}");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_differs_for_different_args() {
        let gen = CacheKeyGenerator::new("compute_sum", false);
        assert_ne!(gen.key_for(&(1, 2, 3)), gen.key_for(&(1, 2, 4)));
        assert_ne!(gen.key_for(&(1, 2, 3)), gen.key_for(&(3, 2, 1)));
    }

    #[test]
    fn test_key_differs_for_different_functions() {
        let a = CacheKeyGenerator::new("a", false);
        let b = CacheKeyGenerator::new("b", false);
        assert_ne!(a.key_for(&(1,)), b.key_for(&(1,)));
    }

    #[test]
    fn test_order_vain_ignores_argument_order() {
        let gen = CacheKeyGenerator::new("compute_sum", true);
        assert_eq!(gen.key_for(&(1, 2, 3)), gen.key_for(&(3, 2, 1)));
        assert_ne!(gen.key_for(&(1, 2, 3)), gen.key_for(&(1, 2, 2)));
    }

    #[test]
    fn test_number_and_string_share_a_key() {
        let gen = CacheKeyGenerator::new("lookup", false);
        assert_eq!(gen.key_for(&(1,)), gen.key_for(&("1",)));
    }

    #[test]
    fn test_null_and_undefined_differ() {
        let gen = CacheKeyGenerator::new("lookup", false);
        let none: Option<u32> = None;
        assert_ne!(gen.key_for(&(none,)), gen.key_for(&((),)));
    }

    #[test]
    fn test_identity_objects_ignore_other_fields() {
        let gen = CacheKeyGenerator::new("load_user", false);
        let a = json!({"id": 7, "name": "alice"});
        let b = json!({"name": "alice (renamed)", "id": 7, "extra": true});
        assert_eq!(gen.key_for(&(a,)), gen.key_for(&(b,)));
    }

    #[test]
    fn test_dates_key_by_instant() {
        let gen = CacheKeyGenerator::new("report", false);
        let utc = Utc.timestamp_millis_opt(1_682_536_789_123).unwrap();
        let offset = utc.with_timezone(&chrono::FixedOffset::east_opt(3600).unwrap());
        assert_eq!(gen.key_for(&(utc,)), gen.key_for(&(offset,)));
    }

    #[test]
    fn test_values_mode_collides_on_renamed_fields() {
        let gen = CacheKeyGenerator::new("search", false);
        let a = ArgValue::object([("min", 1), ("max", 2)]);
        let b = ArgValue::object([("low", 1), ("high", 2)]);
        assert_eq!(gen.key_for(&(a,)), gen.key_for(&(b,)));
    }

    #[test]
    fn test_entries_mode_separates_renamed_fields() {
        let gen = CacheKeyGenerator::new("search", false)
            .with_object_fingerprint(ObjectFingerprint::Entries);
        let a = ArgValue::object([("min", 1), ("max", 2)]);
        let b = ArgValue::object([("low", 1), ("high", 2)]);
        assert_ne!(gen.key_for(&(a,)), gen.key_for(&(b,)));
    }

    #[test]
    fn test_nested_arrays_keep_structure() {
        let gen = CacheKeyGenerator::new("batch", false);
        let nested = (vec![1, 2], 3);
        let flat = (1, 2, 3);
        assert_ne!(gen.key_for(&nested), gen.key_for(&flat));
    }

    #[test]
    fn test_vec_and_tuple_args_agree() {
        let gen = CacheKeyGenerator::new("compute_sum", false);
        assert_eq!(gen.key_for(&vec![1, 2, 3]), gen.key_for(&(1, 2, 3)));
        assert_eq!(gen.key_for(&[1, 2, 3]), gen.key_for(&(1, 2, 3)));
    }

    #[test]
    fn test_sorted_fingerprint() {
        let gen = CacheKeyGenerator::new("compute_sum", true);
        let parts = gen.fingerprint(&(3, 1, 2).cache_args());
        assert_eq!(
            parts,
            vec![
                Fingerprint::Text("1".to_string()),
                Fingerprint::Text("2".to_string()),
                Fingerprint::Text("3".to_string()),
            ]
        );
    }
}

//! Argument Fingerprints
//!
//! Reduces argument values to a tree of primitive textual leaves, which is
//! what actually gets hashed into a cache key.

use sha2::{Digest, Sha256};

use crate::key::ArgValue;

/// Sentinel for absent arguments
pub const UNDEFINED_SENTINEL: &str = "__undefined__";

/// Sentinel for null arguments
pub const NULL_SENTINEL: &str = "__null__";

// == Object Fingerprint Mode ==
/// How key/value objects contribute to a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectFingerprint {
    /// Only the values, in entry order. Field names are discarded, so two
    /// objects holding the same values under different names collide.
    #[default]
    Values,
    /// `[name, value]` pairs, in entry order.
    Entries,
}

// == Fingerprint ==
/// Flattened form of one argument.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Fingerprint {
    Text(String),
    /// Epoch milliseconds of a date argument
    Epoch(i64),
    List(Vec<Fingerprint>),
}

impl Fingerprint {
    /// Flattens a single argument.
    pub fn of(value: &ArgValue, mode: ObjectFingerprint) -> Self {
        match value {
            ArgValue::Undefined => Fingerprint::Text(UNDEFINED_SENTINEL.to_string()),
            ArgValue::Null => Fingerprint::Text(NULL_SENTINEL.to_string()),
            ArgValue::Id(id) => Fingerprint::Text(id.clone()),
            ArgValue::Date(date) => Fingerprint::Epoch(date.timestamp_millis()),
            ArgValue::Bool(b) => Fingerprint::Text(b.to_string()),
            ArgValue::Int(i) => Fingerprint::Text(i.to_string()),
            ArgValue::UInt(u) => Fingerprint::Text(u.to_string()),
            ArgValue::Float(f) => Fingerprint::Text(float_text(*f)),
            ArgValue::Str(s) => Fingerprint::Text(s.clone()),
            ArgValue::Other(s) => Fingerprint::Text(s.clone()),
            ArgValue::Array(items) => Fingerprint::List(Self::of_all(items, mode)),
            ArgValue::Object(entries) => Fingerprint::List(
                entries
                    .iter()
                    .map(|(name, value)| match mode {
                        ObjectFingerprint::Values => Self::of(value, mode),
                        ObjectFingerprint::Entries => Fingerprint::List(vec![
                            Fingerprint::Text(name.clone()),
                            Self::of(value, mode),
                        ]),
                    })
                    .collect(),
            ),
        }
    }

    /// Flattens an argument list, preserving order.
    pub fn of_all(values: &[ArgValue], mode: ObjectFingerprint) -> Vec<Fingerprint> {
        values.iter().map(|v| Self::of(v, mode)).collect()
    }

    /// Textual form used when sorting order-insensitive argument lists.
    ///
    /// Nested lists render as their comma-joined elements.
    pub fn sort_text(&self) -> String {
        match self {
            Fingerprint::Text(s) => s.clone(),
            Fingerprint::Epoch(ms) => ms.to_string(),
            Fingerprint::List(items) => items
                .iter()
                .map(Fingerprint::sort_text)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    // == Hash Feed ==
    /// Writes a length-prefixed, type-tagged encoding into the hasher.
    ///
    /// The tags keep `Text("1")` and `Epoch(1)` apart, and the length
    /// prefixes keep `["ab"]` and `["a", "b"]` apart.
    pub(crate) fn feed(&self, hasher: &mut Sha256) {
        match self {
            Fingerprint::Text(s) => {
                hasher.update([b's']);
                hasher.update((s.len() as u64).to_le_bytes());
                hasher.update(s.as_bytes());
            }
            Fingerprint::Epoch(ms) => {
                hasher.update([b'n']);
                hasher.update(ms.to_le_bytes());
            }
            Fingerprint::List(items) => {
                hasher.update([b'l']);
                hasher.update((items.len() as u64).to_le_bytes());
                for item in items {
                    item.feed(hasher);
                }
            }
        }
    }
}

/// String form of a float: integral values print without a fraction, and
/// negative zero prints as `0`.
fn float_text(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

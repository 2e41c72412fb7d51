//! Argument Model
//!
//! Heterogeneous argument values and the conversion traits used to turn Rust
//! argument lists into something the key generator can fingerprint.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::BuildHasher;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

// == Arg Value ==
/// A single argument as seen by the key generator.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Absent argument
    Undefined,
    /// Explicit null
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    /// Point in time, fingerprinted by its epoch milliseconds
    Date(DateTime<Utc>),
    /// Identifier-bearing object, fingerprinted by identity only
    Id(String),
    Array(Vec<ArgValue>),
    /// Key/value object, entries in a deterministic order
    Object(Vec<(String, ArgValue)>),
    /// Anything else, fingerprinted by its string form
    Other(String),
}

impl ArgValue {
    /// Builds an identity argument from anything with a string form.
    pub fn id(id: impl ToString) -> Self {
        ArgValue::Id(id.to_string())
    }

    /// Builds an opaque argument from its display form.
    pub fn other(value: impl Display) -> Self {
        ArgValue::Other(value.to_string())
    }

    /// Builds an object argument. Entries keep the given order.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: CacheArg,
        I: IntoIterator<Item = (K, V)>,
    {
        ArgValue::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_arg()))
                .collect(),
        )
    }
}

// == Conversion Traits ==
/// Converts a single Rust value into an [`ArgValue`].
pub trait CacheArg {
    fn to_arg(&self) -> ArgValue;
}

/// Converts a whole argument list into the values that make up a cache key.
///
/// Implemented for tuples, sequences and scalar types. A scalar is treated as
/// a one-element argument list.
pub trait CacheArgs {
    fn cache_args(&self) -> Vec<ArgValue>;
}

// == CacheArg: primitives ==
macro_rules! impl_signed_arg {
    ($($ty:ty),*) => {
        $(impl CacheArg for $ty {
            fn to_arg(&self) -> ArgValue {
                ArgValue::Int(*self as i64)
            }
        })*
    };
}

macro_rules! impl_unsigned_arg {
    ($($ty:ty),*) => {
        $(impl CacheArg for $ty {
            fn to_arg(&self) -> ArgValue {
                ArgValue::UInt(*self as u64)
            }
        })*
    };
}

impl_signed_arg!(i8, i16, i32, i64, isize);
impl_unsigned_arg!(u8, u16, u32, u64, usize);

impl CacheArg for i128 {
    fn to_arg(&self) -> ArgValue {
        ArgValue::other(self)
    }
}

impl CacheArg for u128 {
    fn to_arg(&self) -> ArgValue {
        ArgValue::other(self)
    }
}

impl CacheArg for f32 {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Float(f64::from(*self))
    }
}

impl CacheArg for f64 {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Float(*self)
    }
}

impl CacheArg for bool {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Bool(*self)
    }
}

impl CacheArg for char {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Str(self.to_string())
    }
}

impl CacheArg for str {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Str(self.to_string())
    }
}

impl CacheArg for String {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Str(self.clone())
    }
}

impl CacheArg for () {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Undefined
    }
}

impl CacheArg for ArgValue {
    fn to_arg(&self) -> ArgValue {
        self.clone()
    }
}

// == CacheArg: wrappers ==
impl<T: CacheArg + ?Sized> CacheArg for &T {
    fn to_arg(&self) -> ArgValue {
        (**self).to_arg()
    }
}

impl<T: CacheArg + ?Sized> CacheArg for Box<T> {
    fn to_arg(&self) -> ArgValue {
        (**self).to_arg()
    }
}

impl<T: CacheArg + ?Sized> CacheArg for Arc<T> {
    fn to_arg(&self) -> ArgValue {
        (**self).to_arg()
    }
}

impl<T: CacheArg> CacheArg for Option<T> {
    fn to_arg(&self) -> ArgValue {
        match self {
            Some(value) => value.to_arg(),
            None => ArgValue::Null,
        }
    }
}

// == CacheArg: collections ==
impl<T: CacheArg> CacheArg for [T] {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Array(self.iter().map(CacheArg::to_arg).collect())
    }
}

impl<T: CacheArg, const N: usize> CacheArg for [T; N] {
    fn to_arg(&self) -> ArgValue {
        self.as_slice().to_arg()
    }
}

impl<T: CacheArg> CacheArg for Vec<T> {
    fn to_arg(&self) -> ArgValue {
        self.as_slice().to_arg()
    }
}

impl<K: AsRef<str>, V: CacheArg> CacheArg for BTreeMap<K, V> {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Object(
            self.iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.to_arg()))
                .collect(),
        )
    }
}

/// Hash maps have no stable iteration order, so entries are sorted by key.
impl<K: AsRef<str>, V: CacheArg, S: BuildHasher> CacheArg for HashMap<K, V, S> {
    fn to_arg(&self) -> ArgValue {
        let mut entries: Vec<(String, ArgValue)> = self
            .iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.to_arg()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        ArgValue::Object(entries)
    }
}

// == CacheArg: time ==
impl<Tz: TimeZone> CacheArg for DateTime<Tz> {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Date(self.with_timezone(&Utc))
    }
}

impl CacheArg for SystemTime {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Date(DateTime::<Utc>::from(*self))
    }
}

// == CacheArg: JSON ==
/// JSON objects carrying a truthy `_id` or `id` field are reduced to that
/// identifier, so two snapshots of the same record share a key.
impl CacheArg for Value {
    fn to_arg(&self) -> ArgValue {
        match self {
            Value::Null => ArgValue::Null,
            Value::Bool(b) => ArgValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ArgValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    ArgValue::UInt(u)
                } else {
                    ArgValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => ArgValue::Str(s.clone()),
            Value::Array(items) => ArgValue::Array(items.iter().map(CacheArg::to_arg).collect()),
            Value::Object(map) => {
                for field in ["_id", "id"] {
                    if let Some(id) = map.get(field).filter(|v| is_truthy(v)) {
                        return ArgValue::Id(id_text(id));
                    }
                }
                ArgValue::Object(map.iter().map(|(k, v)| (k.clone(), v.to_arg())).collect())
            }
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn id_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// == CacheArgs impls ==
impl CacheArgs for () {
    fn cache_args(&self) -> Vec<ArgValue> {
        Vec::new()
    }
}

macro_rules! impl_tuple_args {
    ($($idx:tt $name:ident),+) => {
        impl<$($name: CacheArg),+> CacheArgs for ($($name,)+) {
            fn cache_args(&self) -> Vec<ArgValue> {
                vec![$(self.$idx.to_arg()),+]
            }
        }
    };
}

impl_tuple_args!(0 A);
impl_tuple_args!(0 A, 1 B);
impl_tuple_args!(0 A, 1 B, 2 C);
impl_tuple_args!(0 A, 1 B, 2 C, 3 D);
impl_tuple_args!(0 A, 1 B, 2 C, 3 D, 4 E);
impl_tuple_args!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F);
impl_tuple_args!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G);
impl_tuple_args!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G, 7 H);

impl<T: CacheArg> CacheArgs for [T] {
    fn cache_args(&self) -> Vec<ArgValue> {
        self.iter().map(CacheArg::to_arg).collect()
    }
}

impl<T: CacheArg, const N: usize> CacheArgs for [T; N] {
    fn cache_args(&self) -> Vec<ArgValue> {
        self.as_slice().cache_args()
    }
}

impl<T: CacheArg> CacheArgs for Vec<T> {
    fn cache_args(&self) -> Vec<ArgValue> {
        self.as_slice().cache_args()
    }
}

macro_rules! impl_scalar_args {
    ($($ty:ty),*) => {
        $(impl CacheArgs for $ty {
            fn cache_args(&self) -> Vec<ArgValue> {
                vec![self.to_arg()]
            }
        })*
    };
}

impl_scalar_args!(
    i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, char, String, Value
);

impl CacheArgs for &str {
    fn cache_args(&self) -> Vec<ArgValue> {
        vec![self.to_arg()]
    }
}

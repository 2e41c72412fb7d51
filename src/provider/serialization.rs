//! Serialization Hooks
//!
//! Replacer/reviver style hooks applied when a provider stores values as
//! text. They let callers marshal values that plain JSON handles badly, such
//! as integers too large for JavaScript consumers sharing the same store.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::Result;

/// Hook called with the field name (or array index, or `""` for the root)
/// and the value found there; returns the value to use instead.
pub type TransformHook = Arc<dyn Fn(&str, Value) -> Value + Send + Sync>;

// == Serialization Options ==
/// Optional serializer/deserializer pair for text-storing providers.
#[derive(Clone, Default)]
pub struct SerializationOptions {
    /// Applied top-down before writing, like a JSON replacer
    pub serializer: Option<TransformHook>,
    /// Applied bottom-up after reading, like a JSON reviver
    pub deserializer: Option<TransformHook>,
}

impl fmt::Debug for SerializationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationOptions")
            .field("serializer", &self.serializer.is_some())
            .field("deserializer", &self.deserializer.is_some())
            .finish()
    }
}

impl SerializationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_serializer<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, Value) -> Value + Send + Sync + 'static,
    {
        self.serializer = Some(Arc::new(hook));
        self
    }

    pub fn with_deserializer<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, Value) -> Value + Send + Sync + 'static,
    {
        self.deserializer = Some(Arc::new(hook));
        self
    }

    // == Serialize ==
    /// Encodes a value as JSON text, running the serializer hook first.
    pub fn serialize(&self, value: Value) -> Result<String> {
        let value = match &self.serializer {
            Some(hook) => replace(hook.as_ref(), "", value),
            None => value,
        };
        Ok(serde_json::to_string(&value)?)
    }

    // == Deserialize ==
    /// Parses JSON text, running the deserializer hook afterwards.
    pub fn deserialize(&self, text: &str) -> Result<Value> {
        let value: Value = serde_json::from_str(text)?;
        Ok(match &self.deserializer {
            Some(hook) => revive(hook.as_ref(), "", value),
            None => value,
        })
    }
}

/// Top-down: the hook sees a container before its children, and the
/// children of whatever it returns are visited next.
fn replace(hook: &(dyn Fn(&str, Value) -> Value + Send + Sync), key: &str, value: Value) -> Value {
    match hook(key, value) {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| replace(hook, &i.to_string(), item))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let replaced = replace(hook, &k, v);
                    (k, replaced)
                })
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

/// Bottom-up: children are revived before the container holding them.
fn revive(hook: &(dyn Fn(&str, Value) -> Value + Send + Sync), key: &str, value: Value) -> Value {
    let value = match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| revive(hook, &i.to_string(), item))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let revived = revive(hook, &k, v);
                    (k, revived)
                })
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    };
    hook(key, value)
}

//! Stored Envelope
//!
//! Every memoized result is stored as `{"data": ..., "reject": bool}`, where
//! `reject` marks a cached failure of a single call.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::provider::{CacheProvider, Payload};

// == Cached Item ==
/// A cached outcome: a value, or a failure when `reject` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedItem<D> {
    pub data: D,
    pub reject: bool,
}

impl<D> CachedItem<D> {
    pub fn resolved(data: D) -> Self {
        Self {
            data,
            reject: false,
        }
    }

    pub fn rejected(reason: D) -> Self {
        Self { data: reason, reject: true }
    }
}

impl CachedItem<Value> {
    /// Decodes the data as the success or the failure type.
    pub fn resolve<T, E>(self) -> Result<std::result::Result<T, E>>
    where
        T: DeserializeOwned,
        E: DeserializeOwned,
    {
        if self.reject {
            Ok(Err(serde_json::from_value(self.data)?))
        } else {
            Ok(Ok(serde_json::from_value(self.data)?))
        }
    }
}

// == Marshaling ==
/// Turns an envelope into the payload shape the provider stores.
pub(crate) fn encode<D: Serialize>(provider: &dyn CacheProvider, item: &CachedItem<D>) -> Result<Payload> {
    let value = serde_json::to_value(item)?;
    if provider.stores_as_obj() {
        Ok(Payload::Object(value))
    } else {
        Ok(Payload::Text(provider.serialization_options().serialize(value)?))
    }
}

/// Reads an envelope back from a stored payload.
pub(crate) fn decode(provider: &dyn CacheProvider, payload: Payload) -> Result<CachedItem<Value>> {
    let value = match payload {
        Payload::Object(value) => value,
        Payload::Text(text) => provider.serialization_options().deserialize(&text)?,
    };
    Ok(serde_json::from_value(value)?)
}

//! JSON encoding of cached values.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CacheError;
use crate::target::is_negative_marker;

/// A value that can be cached by [`Cache::get_or_create`](crate::Cache::get_or_create).
///
/// `is_absent` decides whether an origin result counts as "no data". The default says every
/// value is real data; containers report themselves absent when empty.
pub trait CacheValue: Serialize + DeserializeOwned + Send + 'static {
    fn is_absent(&self) -> bool {
        false
    }
}

/// Encode a value as JSON.
///
/// Fails if the encoding would be indistinguishable from the negative marker.
pub fn encode<V: Serialize + ?Sized>(value: &V) -> Result<String, CacheError> {
    let payload = serde_json::to_string(value)
        .map_err(|e| CacheError::Serialization(format!("Serialization failed: {}", e)))?;
    check_payload(payload)
}

/// Decode a JSON payload.
pub fn decode<V: DeserializeOwned>(payload: &str) -> Result<V, CacheError> {
    serde_json::from_str(payload)
        .map_err(|e| CacheError::Serialization(format!("Deserialization failed: {}", e)))
}

/// Reject payloads that collide with the negative marker.
pub(crate) fn check_payload(payload: String) -> Result<String, CacheError> {
    if is_negative_marker(&payload) {
        return Err(CacheError::Serialization(
            "encoded value collides with the negative marker".to_string(),
        ));
    }
    Ok(payload)
}

impl CacheValue for String {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl<T: CacheValue> CacheValue for Vec<T> {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl<T: CacheValue> CacheValue for Option<T> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

impl<T: CacheValue> CacheValue for HashMap<String, T> {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl CacheValue for serde_json::Value {
    fn is_absent(&self) -> bool {
        self.is_null()
    }
}

macro_rules! present_values {
    ($($ty:ty),*) => {
        $(impl CacheValue for $ty {})*
    };
}

present_values!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

//! Addressing of values in the backing store.

use std::fmt;
use std::time::Duration;

use crate::error::CacheError;

/// Stored value meaning "the origin confirmed there is no data".
///
/// A missing key means the value was never resolved. Encoders must never produce this
/// payload for a real value.
pub const NEGATIVE_MARKER: &str = "";

/// Returns true if the payload is the negative marker.
pub fn is_negative_marker(payload: &str) -> bool {
    payload == NEGATIVE_MARKER
}

/// Physical storage layout of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Flat key/value.
    String,
    /// Field inside a hash. The TTL applies to the whole outer key.
    Hash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    String,
    Hash { field: String },
}

/// Where a cached value lives and for how long.
///
/// Built per call through [`CacheTarget::string`] or [`CacheTarget::hash`], which reject empty
/// keys and fields. A zero `ttl` means the entry never expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTarget {
    key: String,
    location: Location,
    ttl: Duration,
}

impl CacheTarget {
    /// Address a flat key.
    pub fn string(key: impl Into<String>, ttl: Duration) -> Result<Self, CacheError> {
        let key = non_empty(key.into(), "key")?;
        Ok(CacheTarget {
            key,
            location: Location::String,
            ttl,
        })
    }

    /// Address a field of a hash.
    pub fn hash(
        key: impl Into<String>,
        field: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self, CacheError> {
        let key = non_empty(key.into(), "key")?;
        let field = non_empty(field.into(), "hash field")?;
        Ok(CacheTarget {
            key,
            location: Location::Hash { field },
            ttl,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The hash field, `None` for string targets.
    pub fn field(&self) -> Option<&str> {
        match &self.location {
            Location::String => None,
            Location::Hash { field } => Some(field),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn shape(&self) -> Shape {
        match self.location {
            Location::String => Shape::String,
            Location::Hash { .. } => Shape::Hash,
        }
    }

    /// Rewrite the key in place. Used by hot-key sharding.
    pub fn set_key(&mut self, key: impl Into<String>) -> Result<(), CacheError> {
        self.key = non_empty(key.into(), "key")?;
        Ok(())
    }
}

impl fmt::Display for CacheTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Location::String => write!(f, "{}", self.key),
            Location::Hash { field } => write!(f, "{}#{}", self.key, field),
        }
    }
}

fn non_empty(value: String, what: &str) -> Result<String, CacheError> {
    if value.is_empty() {
        return Err(CacheError::Validation(format!("{what} must not be empty")));
    }
    Ok(value)
}

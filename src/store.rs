use async_trait::async_trait;
use std::time::Duration;

use crate::error::CacheError;
use crate::target::{CacheTarget, Shape};

/// A backing store is the remote key/hash store every miss resolves through.
///
/// Implementors provide the Redis-shaped primitives; the target-level operations
/// (`read`, `write`, `read_many`, `write_many`, `remove`) dispatch on the target's shape and
/// are what the orchestrators use.
///
/// A zero `ttl` means "no expiry": implementations must not issue an expire command for it.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// A name for metrics/tracing.
    ///
    /// # Example
    /// - "memory"
    /// - "redis"
    fn name(&self) -> &'static str;

    /// Return the value of a flat key. `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Set a flat key, replacing any previous TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Return a hash field. `None` when the key or the field is absent.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheError>;

    /// Set a hash field and, for a non-zero `ttl`, the expiry of the whole key.
    async fn hset(&self, key: &str, field: &str, value: &str, ttl: Duration)
    -> Result<(), CacheError>;

    /// Return the values of several flat keys, in order, `None` for absent keys.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError>;

    /// Return several fields of one hash, in order, `None` for absent fields.
    async fn hmget(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>, CacheError>;

    /// Set several flat keys with their own TTLs in one round trip.
    async fn mset(&self, entries: &[(String, String, Duration)]) -> Result<(), CacheError>;

    /// Set several fields of one hash and the key's TTL in one round trip.
    async fn hmset(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Removes the key(s) from the store.
    async fn del(&self, keys: &[String]) -> Result<(), CacheError>;

    /// Removes fields from a hash.
    async fn hdel(&self, key: &str, fields: &[String]) -> Result<(), CacheError>;

    /// Read the value a target points at.
    async fn read(&self, target: &CacheTarget) -> Result<Option<String>, CacheError> {
        match target.field() {
            None => self.get(target.key()).await,
            Some(field) => self.hget(target.key(), field).await,
        }
    }

    /// Write a value at a target, applying the target's TTL.
    async fn write(&self, target: &CacheTarget, value: &str) -> Result<(), CacheError> {
        match target.field() {
            None => self.set(target.key(), value, target.ttl()).await,
            Some(field) => self.hset(target.key(), field, value, target.ttl()).await,
        }
    }

    /// Read many targets of one shape in one round trip.
    ///
    /// Hash targets are read from the first target's key.
    async fn read_many(&self, targets: &[CacheTarget]) -> Result<Vec<Option<String>>, CacheError> {
        let Some(shape) = batch_shape(targets.iter())? else {
            return Ok(Vec::new());
        };

        match shape {
            Shape::String => {
                let keys: Vec<String> = targets.iter().map(|t| t.key().to_string()).collect();
                self.mget(&keys).await
            }
            Shape::Hash => {
                let fields: Vec<String> = targets
                    .iter()
                    .filter_map(|t| t.field().map(str::to_string))
                    .collect();
                self.hmget(targets[0].key(), &fields).await
            }
        }
    }

    /// Write many targets of one shape in one pipelined round trip.
    ///
    /// Hash targets are written under the first target's key with the first target's TTL.
    async fn write_many(&self, entries: &[(CacheTarget, String)]) -> Result<(), CacheError> {
        let Some(shape) = batch_shape(entries.iter().map(|(t, _)| t))? else {
            return Ok(());
        };

        match shape {
            Shape::String => {
                let items: Vec<(String, String, Duration)> = entries
                    .iter()
                    .map(|(t, v)| (t.key().to_string(), v.clone(), t.ttl()))
                    .collect();
                self.mset(&items).await
            }
            Shape::Hash => {
                let first = &entries[0].0;
                let fields: Vec<(String, String)> = entries
                    .iter()
                    .filter_map(|(t, v)| t.field().map(|f| (f.to_string(), v.clone())))
                    .collect();
                self.hmset(first.key(), &fields, first.ttl()).await
            }
        }
    }

    /// Remove whatever a target points at: the key for strings, the field for hashes.
    async fn remove(&self, target: &CacheTarget) -> Result<(), CacheError> {
        match target.field() {
            None => self.del(&[target.key().to_string()]).await,
            Some(field) => self.hdel(target.key(), &[field.to_string()]).await,
        }
    }
}

/// An in-process TTL cache placed in front of the backing store for hot keys.
///
/// Implementations are shared across targets and must be internally thread-safe.
#[async_trait]
pub trait LocalCache: Send + Sync {
    /// A name for metrics/tracing.
    fn name(&self) -> &'static str;

    /// Return the cached value, or `CacheError::LocalCacheMiss` when there is none.
    async fn get(&self, key: &str) -> Result<String, CacheError>;

    /// Cache a value under the target's key for the target's TTL.
    async fn set(&self, target: &CacheTarget, value: &str) -> Result<(), CacheError>;

    /// Removes the key.
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// The shared shape of a batch, `None` for an empty batch.
fn batch_shape<'a>(
    mut targets: impl Iterator<Item = &'a CacheTarget>,
) -> Result<Option<Shape>, CacheError> {
    let Some(first) = targets.next() else {
        return Ok(None);
    };
    let shape = first.shape();
    if targets.any(|t| t.shape() != shape) {
        return Err(CacheError::Validation(
            "batch targets must share one shape".to_string(),
        ));
    }
    Ok(Some(shape))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_shape() {
        let a = CacheTarget::string("a", Duration::ZERO).unwrap();
        let b = CacheTarget::string("b", Duration::ZERO).unwrap();
        let h = CacheTarget::hash("h", "f", Duration::ZERO).unwrap();

        assert_eq!(batch_shape(std::iter::empty()).unwrap(), None);
        assert_eq!(batch_shape([a.clone(), b].iter()).unwrap(), Some(Shape::String));
        assert!(matches!(
            batch_shape([a, h].iter()),
            Err(CacheError::Validation(_))
        ));
    }
}

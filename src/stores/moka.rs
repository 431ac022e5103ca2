use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use std::time::{Duration, Instant};

use crate::error::CacheError;
use crate::store::LocalCache;
use crate::target::CacheTarget;

/// Configuration for MokaLocalCache.
#[derive(Debug, Clone)]
pub struct MokaLocalCacheConfig {
    /// Maximum number of entries the cache can hold.
    pub max_capacity: u64,

    /// Time to idle: entries are expired if not accessed within this duration.
    /// `None` means entries only expire by their own TTL or by size limit.
    pub time_to_idle: Option<Duration>,
}

impl Default for MokaLocalCacheConfig {
    fn default() -> Self {
        MokaLocalCacheConfig {
            max_capacity: 10_000,
            time_to_idle: None,
        }
    }
}

#[derive(Clone)]
struct LocalEntry {
    payload: String,
    ttl: Duration,
}

/// Expires every entry after the TTL of the target it was written with.
struct TargetExpiry;

impl TargetExpiry {
    fn ttl_of(entry: &LocalEntry) -> Option<Duration> {
        (!entry.ttl.is_zero()).then_some(entry.ttl)
    }
}

impl Expiry<String, LocalEntry> for TargetExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &LocalEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Self::ttl_of(value)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &LocalEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Self::ttl_of(value)
    }
}

/// In-process local cache for hot keys, backed by Moka.
///
/// Each entry lives for the TTL of the [`CacheTarget`] it was written with; a zero TTL keeps
/// it until it is evicted by size or idleness. Lock-free for concurrent readers and writers,
/// so one instance can be shared by every hot-key policy of a process.
pub struct MokaLocalCache {
    cache: Cache<String, LocalEntry>,
}

impl MokaLocalCache {
    /// Create a new MokaLocalCache with the given configuration.
    ///
    /// # Example
    /// ```ignore
    /// let config = MokaLocalCacheConfig {
    ///     max_capacity: 1_000,
    ///     time_to_idle: Some(Duration::from_secs(30)),
    /// };
    /// let local = Arc::new(MokaLocalCache::new(config));
    /// ```
    pub fn new(config: MokaLocalCacheConfig) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(TargetExpiry);

        if let Some(tti) = config.time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        MokaLocalCache {
            cache: builder.build(),
        }
    }

    /// Get cache statistics (for monitoring/debugging).
    pub fn stats(&self) -> (u64, u64) {
        let entry_count = self.cache.entry_count();
        let weighted_size = self.cache.weighted_size();
        (entry_count, weighted_size)
    }
}

#[async_trait]
impl LocalCache for MokaLocalCache {
    fn name(&self) -> &'static str {
        "moka"
    }

    async fn get(&self, key: &str) -> Result<String, CacheError> {
        match self.cache.get(key).await {
            Some(entry) => Ok(entry.payload),
            None => Err(CacheError::LocalCacheMiss {
                key: key.to_string(),
            }),
        }
    }

    async fn set(&self, target: &CacheTarget, value: &str) -> Result<(), CacheError> {
        self.cache
            .insert(
                target.key().to_string(),
                LocalEntry {
                    payload: value.to_string(),
                    ttl: target.ttl(),
                },
            )
            .await;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}

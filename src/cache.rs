use std::sync::Arc;

use crate::error::CacheError;
use crate::hotkey::{self, Route};
use crate::options::CallOptions;
use crate::store::BackingStore;
use crate::target::CacheTarget;

/// High-level cache API over a backing store.
///
/// `Cache` is cheap to clone and holds no per-key state: locks, hot-key policies and local
/// caches travel with each call in [`CallOptions`]. The get-or-create entry points live in
/// `single.rs` (one key) and `batch.rs` (many models).
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn BackingStore>,
}

impl Cache {
    /// Create a new Cache over the given store.
    ///
    /// # Example
    /// ```ignore
    /// let redis = Arc::new(RedisStore::new(RedisStoreConfig::default()).await?);
    /// let cache = Cache::new(redis);
    /// ```
    pub fn new(store: Arc<dyn BackingStore>) -> Self {
        Cache { store }
    }

    /// The underlying backing store.
    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }

    /// Write a payload at a target, honouring the call's hot-key policy.
    ///
    /// Passing [`NEGATIVE_MARKER`](crate::NEGATIVE_MARKER) records that the origin has no data.
    pub async fn set(
        &self,
        mut target: CacheTarget,
        payload: &str,
        opts: &CallOptions,
    ) -> Result<(), CacheError> {
        let route = hotkey::route(opts.hot_key(), &mut target)?;
        self.write_back(&target, &route, payload).await
    }

    /// Remove the entry at a target from the backing store and, for locally cached hot keys,
    /// from the local cache.
    pub async fn invalidate(
        &self,
        mut target: CacheTarget,
        opts: &CallOptions,
    ) -> Result<(), CacheError> {
        let route = hotkey::route(opts.hot_key(), &mut target)?;
        if let Route::Local {
            cache,
            target: local,
        } = &route
        {
            cache.del(local.key()).await?;
        }
        self.store.remove(&target).await
    }

    /// Write through the route: local cache first (best effort), then the backing store.
    pub(crate) async fn write_back(
        &self,
        target: &CacheTarget,
        route: &Route,
        payload: &str,
    ) -> Result<(), CacheError> {
        if let Route::Local {
            cache,
            target: local,
        } = route
            && let Err(e) = cache.set(local, payload).await
        {
            tracing::warn!(
                "Failed to populate local cache: cache={}, key={}, error={}",
                cache.name(),
                local.key(),
                e
            );
        }

        self.store.write(target, payload).await
    }
}

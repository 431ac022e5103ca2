//! Hot-key mitigation: key sharding or a local in-process cache.
//!
//! A [`HotKeyPolicy`] is attached to a call through
//! [`CallOptions::with_hot_key`](crate::CallOptions::with_hot_key). Once per call it decides
//! whether the key is hot and, if so, how to spread the load:
//!
//! - **Local cache**: reads are served from the local cache first and writes go through it.
//!   A local miss still reads the backing store and copies a hit into the local cache.
//! - **Sharding**: the target key is replaced by the caller's shard key before any store
//!   access. The policy does not hash; spreading the load is the shard function's job.
//!
//! When both are configured, the local cache wins.
//!
//! # Example
//!
//! ```ignore
//! let local = Arc::new(MokaLocalCache::new(MokaLocalCacheConfig::default()));
//! let policy = HotKeyPolicy::builder()
//!     .is_hot(|| hot_keys.contains("u:1"))
//!     .local_cache(local, CacheTarget::string("u:1", Duration::from_secs(1))?)
//!     .build()?;
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::CacheError;
use crate::store::LocalCache;
use crate::target::CacheTarget;

/// Decides whether the current call targets a hot key.
pub type HotKeyPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Computes the sharded key from the target's key.
pub type ShardKeyFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Clone)]
enum Mitigation {
    Sharding(ShardKeyFn),
    LocalCache {
        cache: Arc<dyn LocalCache>,
        target: CacheTarget,
    },
}

/// Per-call hot-key handling. Build with [`HotKeyPolicy::builder`].
#[derive(Clone)]
pub struct HotKeyPolicy {
    is_hot: Option<HotKeyPredicate>,
    mitigation: Mitigation,
}

/// Where a call reads and writes after the policy has been applied.
#[derive(Clone)]
pub(crate) enum Route {
    /// Backing store only.
    Store,
    /// Local cache in front of the backing store.
    Local {
        cache: Arc<dyn LocalCache>,
        target: CacheTarget,
    },
}

impl HotKeyPolicy {
    pub fn builder() -> HotKeyPolicyBuilder {
        HotKeyPolicyBuilder::default()
    }

    /// Whether the key counts as hot right now. Without a predicate every key is hot.
    pub fn is_hot(&self) -> bool {
        self.is_hot.as_ref().is_none_or(|is_hot| is_hot())
    }

    /// Whether the local-cache strategy is in effect.
    pub fn uses_local_cache(&self) -> bool {
        matches!(self.mitigation, Mitigation::LocalCache { .. })
    }

    /// Apply the policy to a target, rewriting its key when sharding is in effect.
    pub(crate) fn route(&self, target: &mut CacheTarget) -> Result<Route, CacheError> {
        if !self.is_hot() {
            return Ok(Route::Store);
        }

        match &self.mitigation {
            Mitigation::LocalCache { cache, target: local } => {
                tracing::debug!(
                    "Hot key served through local cache: cache={}, key={}",
                    cache.name(),
                    local.key()
                );
                Ok(Route::Local {
                    cache: cache.clone(),
                    target: local.clone(),
                })
            }
            Mitigation::Sharding(shard) => {
                let sharded = shard(target.key());
                tracing::debug!("Hot key sharded: key={}, shard={}", target.key(), sharded);
                target.set_key(sharded)?;
                Ok(Route::Store)
            }
        }
    }
}

impl fmt::Debug for HotKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strategy = match &self.mitigation {
            Mitigation::Sharding(_) => "sharding",
            Mitigation::LocalCache { .. } => "local_cache",
        };
        f.debug_struct("HotKeyPolicy")
            .field("has_predicate", &self.is_hot.is_some())
            .field("strategy", &strategy)
            .finish()
    }
}

/// Resolve the route of a call, with or without a policy.
pub(crate) fn route(
    policy: Option<&HotKeyPolicy>,
    target: &mut CacheTarget,
) -> Result<Route, CacheError> {
    match policy {
        Some(policy) => policy.route(target),
        None => Ok(Route::Store),
    }
}

/// Builder for [`HotKeyPolicy`].
#[derive(Default)]
pub struct HotKeyPolicyBuilder {
    is_hot: Option<HotKeyPredicate>,
    sharding: Option<ShardKeyFn>,
    local: Option<(Arc<dyn LocalCache>, CacheTarget)>,
}

impl HotKeyPolicyBuilder {
    /// Register a hot-key predicate, e.g. backed by live hot-key statistics.
    pub fn is_hot<F>(mut self, is_hot: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.is_hot = Some(Arc::new(is_hot));
        self
    }

    /// Mitigate by rewriting the key with `shard`.
    pub fn sharding<F>(mut self, shard: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.sharding = Some(Arc::new(shard));
        self
    }

    /// Mitigate with a local cache. `target` supplies the local key and TTL.
    pub fn local_cache(mut self, cache: Arc<dyn LocalCache>, target: CacheTarget) -> Self {
        self.local = Some((cache, target));
        self
    }

    pub fn build(self) -> Result<HotKeyPolicy, CacheError> {
        let mitigation = match (self.local, self.sharding) {
            (Some((cache, target)), _) => Mitigation::LocalCache { cache, target },
            (None, Some(shard)) => Mitigation::Sharding(shard),
            (None, None) => return Err(CacheError::HotKeyPolicy),
        };

        Ok(HotKeyPolicy {
            is_hot: self.is_hot,
            mitigation,
        })
    }
}

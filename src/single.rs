//! Single-key get-or-create.
//!
//! Every entry point runs the same protocol:
//!
//! 1. Read through the hot-key route. A hit, including the negative marker, is final.
//! 2. On a miss with a lock configured, acquire it and read again, so callers that queued
//!    behind the first one are served by its write instead of hitting the origin.
//! 3. Ask the origin. "No data" is only written back (as the negative marker) when the call
//!    asked for it.
//! 4. Write back through the same route and release the lock.

use std::future::Future;

use crate::cache::Cache;
use crate::codec::{self, CacheValue};
use crate::error::CacheError;
use crate::hotkey::{self, Route};
use crate::model::OriginModel;
use crate::options::CallOptions;
use crate::target::{CacheTarget, NEGATIVE_MARKER, is_negative_marker};

impl Cache {
    /// Get the cached value or load it from origin and cache it.
    ///
    /// `fetch` returns `Ok(None)` when the origin has no data; a value whose
    /// [`CacheValue::is_absent`] is true counts as no data too. Absence surfaces as
    /// `CacheError::NoData`, whether it was just learned or read back as a negative entry.
    ///
    /// If the value was fetched but could not be written back, the error is
    /// `CacheError::WriteBack` and the value is still available via [`CacheError::recover`].
    ///
    /// # Example
    /// ```ignore
    /// let target = CacheTarget::string("user:1", Duration::from_secs(60))?;
    /// let user: User = cache
    ///     .get_or_create(
    ///         target,
    ///         || async { db.find_user(1).await.map_err(CacheError::origin) },
    ///         &opts,
    ///     )
    ///     .await?;
    /// ```
    pub async fn get_or_create<V, F, Fut>(
        &self,
        target: CacheTarget,
        fetch: F,
        opts: &CallOptions,
    ) -> Result<V, CacheError>
    where
        V: CacheValue,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<V>, CacheError>> + Send,
    {
        let payload = self.get_or_create_raw(target, fetch, opts).await?;
        codec::decode(&payload)
    }

    /// Like [`Cache::get_or_create`], but returns the stored payload without decoding it.
    pub async fn get_or_create_raw<V, F, Fut>(
        &self,
        target: CacheTarget,
        fetch: F,
        opts: &CallOptions,
    ) -> Result<String, CacheError>
    where
        V: CacheValue,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<V>, CacheError>> + Send,
    {
        self.resolve(
            target,
            || async move {
                match fetch().await? {
                    Some(value) if !value.is_absent() => codec::encode(&value).map(Some),
                    _ => Ok(None),
                }
            },
            opts,
        )
        .await
    }

    /// Get-or-create for a model: the cached payload, or the origin's copy once cached, is
    /// unmarshalled into `model`.
    pub async fn get_or_create_model<M>(
        &self,
        model: &mut M,
        opts: &CallOptions,
    ) -> Result<(), CacheError>
    where
        M: OriginModel,
    {
        let target = model.cache_info()?;
        let payload = {
            let source: &M = model;
            self.resolve(
                target,
                move || async move {
                    match source.load_origin().await? {
                        Some(fresh) => fresh.marshal().and_then(codec::check_payload).map(Some),
                        None => Ok(None),
                    }
                },
                opts,
            )
            .await
        };
        match payload {
            Ok(payload) => model.unmarshal(&payload),
            // The origin value is still handed to the model when only the write failed.
            Err(CacheError::WriteBack { payload, source }) => {
                model.unmarshal(&payload)?;
                Err(CacheError::WriteBack { payload, source })
            }
            Err(e) => Err(e),
        }
    }

    /// Run the get-or-create protocol with an origin that already yields encoded payloads.
    async fn resolve<F, Fut>(
        &self,
        mut target: CacheTarget,
        fetch: F,
        opts: &CallOptions,
    ) -> Result<String, CacheError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<String>, CacheError>> + Send,
    {
        let route = hotkey::route(opts.hot_key(), &mut target)?;

        if let Some(payload) = self.lookup(&target, &route, opts).await? {
            return into_payload(&target, payload);
        }

        let guard = match opts.lock() {
            Some(lock) => {
                let guard = lock.acquire().await;
                // Another caller may have populated the entry while we waited.
                if let Some(payload) = self.lookup(&target, &route, opts).await? {
                    return into_payload(&target, payload);
                }
                Some(guard)
            }
            None => None,
        };

        tracing::debug!("Loading from origin: store={}, target={}", self.store().name(), target);
        let payload = match fetch().await? {
            Some(payload) => payload,
            None if opts.need_cache_no_data() => NEGATIVE_MARKER.to_string(),
            None => return Err(no_data(&target)),
        };

        let written = self.write_back(&target, &route, &payload).await;
        drop(guard);

        match written {
            Ok(()) => into_payload(&target, payload),
            Err(e) if is_negative_marker(&payload) => Err(e),
            Err(e) => Err(CacheError::WriteBack {
                payload,
                source: Box::new(e),
            }),
        }
    }

    /// Read a target through its route. `None` means nothing is cached at all.
    async fn lookup(
        &self,
        target: &CacheTarget,
        route: &Route,
        opts: &CallOptions,
    ) -> Result<Option<String>, CacheError> {
        if let Route::Local {
            cache,
            target: local,
        } = route
        {
            match cache.get(local.key()).await {
                Ok(payload) => return Ok(Some(payload)),
                Err(CacheError::LocalCacheMiss { .. }) => {}
                Err(e) => {
                    tracing::warn!(
                        "Local cache read failed, using store: cache={}, key={}, error={}",
                        cache.name(),
                        local.key(),
                        e
                    );
                }
            }
        }

        let found = self.store().read(target).await;
        opts.notify_store_access();
        let found = found?;

        if let (
            Some(payload),
            Route::Local {
                cache,
                target: local,
            },
        ) = (&found, route)
            && let Err(e) = cache.set(local, payload).await
        {
            tracing::warn!(
                "Failed to populate local cache: cache={}, key={}, error={}",
                cache.name(),
                local.key(),
                e
            );
        }

        Ok(found)
    }
}

fn into_payload(target: &CacheTarget, payload: String) -> Result<String, CacheError> {
    if is_negative_marker(&payload) {
        return Err(no_data(target));
    }
    Ok(payload)
}

fn no_data(target: &CacheTarget) -> CacheError {
    CacheError::NoData {
        key: target.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::HotKeyPolicy;
    use crate::store::{BackingStore, LocalCache};
    use crate::stores::memory::{MemoryStore, MemoryStoreConfig};
    use crate::stores::moka::{MokaLocalCache, MokaLocalCacheConfig};
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        id: u64,
    }

    impl CacheValue for User {}

    fn setup() -> (Arc<MemoryStore>, Cache) {
        let store = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
        let cache = Cache::new(store.clone());
        (store, cache)
    }

    #[tokio::test]
    async fn test_miss_loads_from_origin_then_hits() {
        let (store, cache) = setup();
        let target = CacheTarget::string("u:1", Duration::ZERO).unwrap();
        let call_count = Arc::new(AtomicUsize::new(0));

        let count = call_count.clone();
        let user: User = cache
            .get_or_create(
                target.clone(),
                move || async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(User { id: 1 }))
                },
                &CallOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(user, User { id: 1 });
        assert_eq!(store.get("u:1").await.unwrap(), Some(r#"{"id":1}"#.to_string()));

        let user: User = cache
            .get_or_create(
                target,
                || async { Err(CacheError::Origin("must not be called".into())) },
                &CallOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(user, User { id: 1 });
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_origin_error_writes_nothing() {
        let (store, cache) = setup();
        let target = CacheTarget::string("u:1", Duration::ZERO).unwrap();

        let result: Result<User, _> = cache
            .get_or_create(
                target,
                || async { Err(CacheError::origin("db down")) },
                &CallOptions::new().cache_no_data(),
            )
            .await;

        assert!(matches!(result, Err(CacheError::Origin(_))));
        assert_eq!(store.get("u:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_absent_value_counts_as_no_data() {
        let (store, cache) = setup();
        let target = CacheTarget::string("names:none", Duration::ZERO).unwrap();

        let result = cache
            .get_or_create_raw(
                target,
                || async { Ok(Some(Vec::<String>::new())) },
                &CallOptions::new(),
            )
            .await;

        assert!(matches!(result, Err(CacheError::NoData { .. })));
        assert_eq!(store.get("names:none").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_raw_returns_payload() {
        let (_store, cache) = setup();
        let target = CacheTarget::hash("u:1", "profile", Duration::ZERO).unwrap();

        let payload = cache
            .get_or_create_raw(target, || async { Ok(Some(User { id: 3 })) }, &CallOptions::new())
            .await
            .unwrap();
        assert_eq!(payload, r#"{"id":3}"#);
    }

    #[tokio::test]
    async fn test_corrupt_cached_value_is_fatal() {
        let (store, cache) = setup();
        store.set("u:1", "not json", Duration::ZERO).await.unwrap();

        let result: Result<User, _> = cache
            .get_or_create(
                CacheTarget::string("u:1", Duration::ZERO).unwrap(),
                || async { Ok(Some(User { id: 1 })) },
                &CallOptions::new(),
            )
            .await;

        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_store_access_callback_fires_per_read() {
        let (_store, cache) = setup();
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = reads.clone();
        let opts = CallOptions::new()
            .with_lock(Arc::new(tokio::sync::Mutex::new(())))
            .on_store_access(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let _: User = cache
            .get_or_create(
                CacheTarget::string("u:1", Duration::ZERO).unwrap(),
                || async { Ok(Some(User { id: 1 })) },
                &opts,
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        // READ1 and READ2 both reached the store.
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_local_cache_hit_skips_store() {
        let (store, cache) = setup();
        let local = Arc::new(MokaLocalCache::new(MokaLocalCacheConfig::default()));
        let local_target = CacheTarget::string("local:u:1", Duration::from_secs(60)).unwrap();
        local.set(&local_target, r#"{"id":9}"#).await.unwrap();

        let reads = Arc::new(AtomicUsize::new(0));
        let counter = reads.clone();
        let policy = HotKeyPolicy::builder()
            .local_cache(local, local_target)
            .build()
            .unwrap();
        let opts = CallOptions::new()
            .with_hot_key(policy)
            .on_store_access(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let user: User = cache
            .get_or_create(
                CacheTarget::string("u:1", Duration::ZERO).unwrap(),
                || async { Err(CacheError::Origin("must not be called".into())) },
                &opts,
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(user, User { id: 9 });
        assert_eq!(reads.load(Ordering::SeqCst), 0);
        assert_eq!(store.get("u:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_local_cache_miss_populated_from_store() {
        let (store, cache) = setup();
        store.set("u:1", r#"{"id":5}"#, Duration::ZERO).await.unwrap();

        let local = Arc::new(MokaLocalCache::new(MokaLocalCacheConfig::default()));
        let policy = HotKeyPolicy::builder()
            .local_cache(
                local.clone(),
                CacheTarget::string("local:u:1", Duration::from_secs(60)).unwrap(),
            )
            .build()
            .unwrap();

        let user: User = cache
            .get_or_create(
                CacheTarget::string("u:1", Duration::ZERO).unwrap(),
                || async { Err(CacheError::Origin("must not be called".into())) },
                &CallOptions::new().with_hot_key(policy),
            )
            .await
            .unwrap();

        assert_eq!(user, User { id: 5 });
        assert_eq!(local.get("local:u:1").await.unwrap(), r#"{"id":5}"#);
    }
}

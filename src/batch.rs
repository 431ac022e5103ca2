//! Batch get-or-create over many models.
//!
//! One multi-get serves every model it can. The misses go to the origin together, are handed
//! back to their models in order, and are written back in one pipelined round trip. A cached
//! value that fails to decode does not stop the rest of the batch: it is reported as
//! `CacheError::BatchDecode` once everything else is done.
//!
//! Hot-key policies and locks are single-key concerns and are not applied here.

use std::future::Future;

use crate::cache::Cache;
use crate::codec;
use crate::error::CacheError;
use crate::model::BatchModel;
use crate::options::CallOptions;
use crate::target::{CacheTarget, NEGATIVE_MARKER, is_negative_marker};

impl Cache {
    /// Fill `models` from the cache, loading the misses from origin with one `fetch` call.
    ///
    /// `fetch` receives clones of the missed models and must return exactly one result per
    /// model, in the same order; `None` means the origin has no data for that model.
    ///
    /// # Example
    /// ```ignore
    /// let mut users = vec![User::new(1), User::new(2), User::new(3)];
    /// cache
    ///     .mget_or_create(&mut users, |missed| async move { db.load_users(missed).await }, &opts)
    ///     .await?;
    /// ```
    pub async fn mget_or_create<M, F, Fut>(
        &self,
        models: &mut [M],
        fetch: F,
        opts: &CallOptions,
    ) -> Result<(), CacheError>
    where
        M: BatchModel,
        F: FnOnce(Vec<M>) -> Fut + Send,
        Fut: Future<Output = Result<Vec<Option<M>>, CacheError>> + Send,
    {
        if models.is_empty() {
            return Ok(());
        }

        let targets = models
            .iter()
            .map(|model| model.cache_info())
            .collect::<Result<Vec<CacheTarget>, _>>()?;

        let found = self.store().read_many(&targets).await;
        opts.notify_store_access();
        let found = found?;
        if found.len() != targets.len() {
            return Err(CacheError::store(
                self.store().name(),
                targets[0].key(),
                format!(
                    "multi-get returned {} value(s) for {} target(s)",
                    found.len(),
                    targets.len()
                ),
            ));
        }

        let mut failed = Vec::new();
        let mut missed = Vec::new();
        let mut missed_at = Vec::new();
        for (index, payload) in found.into_iter().enumerate() {
            match payload {
                Some(payload) if is_negative_marker(&payload) => {}
                Some(payload) => {
                    if let Err(e) = models[index].unmarshal(&payload) {
                        tracing::warn!(
                            "Failed to decode cached value: target={}, error={}",
                            targets[index],
                            e
                        );
                        failed.push(targets[index].to_string());
                    }
                }
                None => {
                    missed.push(models[index].clone());
                    missed_at.push(index);
                }
            }
        }

        let soft_result = if failed.is_empty() {
            Ok(())
        } else {
            Err(CacheError::BatchDecode { keys: failed })
        };

        if missed.is_empty() {
            return soft_result;
        }

        tracing::debug!(
            "Loading batch from origin: store={}, missed={}",
            self.store().name(),
            missed.len()
        );
        let loaded = fetch(missed.clone()).await?;
        if loaded.len() != missed.len() {
            return Err(CacheError::ContractViolation {
                expected: missed.len(),
                actual: loaded.len(),
            });
        }

        // Every model gets its origin result, even when an entry cannot be encoded.
        let mut entries = Vec::with_capacity(loaded.len());
        let mut encode_error = None;
        for (placeholder, origin) in missed.iter().zip(&loaded) {
            let payload = match origin {
                Some(fresh) => fresh.marshal().and_then(codec::check_payload).map(Some),
                None if opts.need_cache_no_data() => Ok(Some(NEGATIVE_MARKER.to_string())),
                None => Ok(None),
            };
            let entry = payload.and_then(|payload| match payload {
                Some(payload) => Ok(Some((placeholder.cache_info()?, payload))),
                None => Ok(None),
            });
            match entry {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => {
                    encode_error.get_or_insert(e);
                }
            }
        }

        for (&index, origin) in missed_at.iter().zip(loaded) {
            models[index].update_self(origin);
        }

        if let Some(e) = encode_error {
            return Err(e);
        }

        if !entries.is_empty() {
            tracing::debug!(
                "Writing back batch: store={}, entries={}",
                self.store().name(),
                entries.len()
            );
            self.store().write_many(&entries).await?;
        }

        soft_result
    }
}

//! Metrics middleware for backing stores.
//!
//! This module provides a `MetricsStore` wrapper that emits metrics for every
//! backing-store command (reads, writes, removes) to a user-provided sink.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use shield_cache::{BackingStore, Cache, MemoryStore, MemoryStoreConfig};
//! use shield_cache::{CacheMetric, MetricsSink, MetricsStore};
//!
//! // Create metrics sink
//! let sink = Arc::new(MyMetricsSink::new());
//!
//! // Wrap store with metrics
//! let memory = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
//! let store: Arc<dyn BackingStore> = Arc::new(MetricsStore::new(memory, sink.clone()));
//!
//! // Use in Cache - metrics emitted automatically
//! let cache = Cache::new(store);
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::CacheError;
use crate::store::BackingStore;

/// Metrics emitted by the MetricsStore wrapper.
#[derive(Debug, Clone)]
pub enum CacheMetric {
    /// Emitted on every single-value read (`GET`, `HGET`).
    Read {
        /// The key that was read.
        key: String,
        /// The hash field, for hash reads.
        field: Option<String>,
        /// Whether a value was found. The negative marker counts as a hit.
        hit: bool,
        /// Latency of the operation in milliseconds.
        latency_ms: f64,
        /// Name of the store tier (from BackingStore::name()).
        tier: String,
    },
    /// Emitted on every multi-value read (`MGET`, `HMGET`).
    BatchRead {
        key_count: usize,
        hits: usize,
        first_key: Option<String>,
        latency_ms: f64,
        tier: String,
    },
    /// Emitted on every single-value write (`SET`, `HSET`).
    Write {
        key: String,
        field: Option<String>,
        latency_ms: f64,
        tier: String,
    },
    /// Emitted on every pipelined batch write.
    BatchWrite {
        key_count: usize,
        first_key: Option<String>,
        latency_ms: f64,
        tier: String,
    },
    /// Emitted on every remove (`DEL`, `HDEL`).
    Remove {
        /// Number of keys or fields removed.
        key_count: usize,
        /// First key in the batch (for debugging/identification).
        first_key: Option<String>,
        latency_ms: f64,
        tier: String,
    },
}

/// Trait for receiving cache metrics.
///
/// Implement this trait to collect metrics from `MetricsStore`.
///
/// # Example
///
/// ```ignore
/// use std::sync::Mutex;
/// use async_trait::async_trait;
/// use shield_cache::{CacheMetric, MetricsSink};
///
/// struct BufferedSink {
///     buffer: Mutex<Vec<CacheMetric>>,
/// }
///
/// #[async_trait]
/// impl MetricsSink for BufferedSink {
///     fn emit(&self, metric: CacheMetric) {
///         self.buffer.lock().unwrap().push(metric);
///     }
///
///     async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///         // Send buffered metrics to your backend
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Emit a single metric.
    ///
    /// This is called synchronously in the hot path of cache operations.
    /// Implementations should be fast (e.g., buffer metrics in memory).
    fn emit(&self, metric: CacheMetric);

    /// Flush any buffered metrics.
    async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A store wrapper that emits metrics for all operations.
///
/// `MetricsStore` wraps any `BackingStore` and emits one metric per command. The
/// target-level operations are inherited from the trait, so a `read_many` shows up as a
/// single `BatchRead`.
pub struct MetricsStore {
    inner: Arc<dyn BackingStore>,
    sink: Arc<dyn MetricsSink>,
    tier_name: String,
}

impl MetricsStore {
    /// Create a new MetricsStore wrapping the given store.
    pub fn new(inner: Arc<dyn BackingStore>, sink: Arc<dyn MetricsSink>) -> Self {
        let tier_name = inner.name().to_string();
        MetricsStore {
            inner,
            sink,
            tier_name,
        }
    }

    /// Get a reference to the metrics sink.
    pub fn sink(&self) -> &Arc<dyn MetricsSink> {
        &self.sink
    }

    fn elapsed_ms(start: Instant) -> f64 {
        start.elapsed().as_secs_f64() * 1000.0
    }

    fn emit_read(
        &self,
        key: &str,
        field: Option<&str>,
        result: &Result<Option<String>, CacheError>,
        start: Instant,
    ) {
        self.sink.emit(CacheMetric::Read {
            key: key.to_string(),
            field: field.map(str::to_string),
            hit: matches!(result, Ok(Some(_))),
            latency_ms: Self::elapsed_ms(start),
            tier: self.tier_name.clone(),
        });
    }

    fn emit_batch_read(
        &self,
        key_count: usize,
        first_key: Option<&str>,
        result: &Result<Vec<Option<String>>, CacheError>,
        start: Instant,
    ) {
        let hits = match result {
            Ok(values) => values.iter().filter(|v| v.is_some()).count(),
            Err(_) => 0,
        };
        self.sink.emit(CacheMetric::BatchRead {
            key_count,
            hits,
            first_key: first_key.map(str::to_string),
            latency_ms: Self::elapsed_ms(start),
            tier: self.tier_name.clone(),
        });
    }

    fn emit_write(&self, key: &str, field: Option<&str>, start: Instant) {
        self.sink.emit(CacheMetric::Write {
            key: key.to_string(),
            field: field.map(str::to_string),
            latency_ms: Self::elapsed_ms(start),
            tier: self.tier_name.clone(),
        });
    }

    fn emit_batch_write(&self, key_count: usize, first_key: Option<&str>, start: Instant) {
        self.sink.emit(CacheMetric::BatchWrite {
            key_count,
            first_key: first_key.map(str::to_string),
            latency_ms: Self::elapsed_ms(start),
            tier: self.tier_name.clone(),
        });
    }

    fn emit_remove(&self, key_count: usize, first_key: Option<&str>, start: Instant) {
        self.sink.emit(CacheMetric::Remove {
            key_count,
            first_key: first_key.map(str::to_string),
            latency_ms: Self::elapsed_ms(start),
            tier: self.tier_name.clone(),
        });
    }
}

#[async_trait]
impl BackingStore for MetricsStore {
    fn name(&self) -> &'static str {
        "metrics"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let start = Instant::now();
        let result = self.inner.get(key).await;
        self.emit_read(key, None, &result, start);
        result
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let start = Instant::now();
        let result = self.inner.set(key, value, ttl).await;
        self.emit_write(key, None, start);
        result
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheError> {
        let start = Instant::now();
        let result = self.inner.hget(key, field).await;
        self.emit_read(key, Some(field), &result, start);
        result
    }

    async fn hset(
        &self,
        key: &str,
        field: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let start = Instant::now();
        let result = self.inner.hset(key, field, value, ttl).await;
        self.emit_write(key, Some(field), start);
        result
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        let start = Instant::now();
        let result = self.inner.mget(keys).await;
        self.emit_batch_read(keys.len(), keys.first().map(String::as_str), &result, start);
        result
    }

    async fn hmget(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        let start = Instant::now();
        let result = self.inner.hmget(key, fields).await;
        self.emit_batch_read(fields.len(), Some(key), &result, start);
        result
    }

    async fn mset(&self, entries: &[(String, String, Duration)]) -> Result<(), CacheError> {
        let start = Instant::now();
        let result = self.inner.mset(entries).await;
        self.emit_batch_write(
            entries.len(),
            entries.first().map(|(k, _, _)| k.as_str()),
            start,
        );
        result
    }

    async fn hmset(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let start = Instant::now();
        let result = self.inner.hmset(key, fields, ttl).await;
        self.emit_batch_write(fields.len(), Some(key), start);
        result
    }

    async fn del(&self, keys: &[String]) -> Result<(), CacheError> {
        let start = Instant::now();
        let result = self.inner.del(keys).await;
        self.emit_remove(keys.len(), keys.first().map(String::as_str), start);
        result
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<(), CacheError> {
        let start = Instant::now();
        let result = self.inner.hdel(key, fields).await;
        self.emit_remove(fields.len(), Some(key), start);
        result
    }
}

//! shield-cache - get-or-populate caching over Redis-like stores
//!
//! This library wraps a backing store with the classic cache-aside read path and the
//! protections it usually needs:
//! - Stampede protection: a per-key lock with a double-checked read
//! - Penetration protection: "no data" cached as a negative marker
//! - Hot-key mitigation: key sharding or an in-process local cache
//! - Batch get-or-create with one multi-get and one pipelined write-back
//!
//! # Example
//!
//! ```ignore
//! use shield_cache::{Cache, CacheError, CacheTarget, CallOptions, RedisStore, RedisStoreConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CacheError> {
//!     let redis = Arc::new(RedisStore::new(RedisStoreConfig::default()).await?);
//!     let cache = Cache::new(redis);
//!
//!     let lock = Arc::new(tokio::sync::Mutex::new(()));
//!     let opts = CallOptions::new().with_lock(lock).cache_no_data();
//!
//!     let target = CacheTarget::string("user:123", Duration::from_secs(300))?;
//!     let name: String = cache
//!         .get_or_create(target, || async { Ok(Some("Ada".to_string())) }, &opts)
//!         .await?;
//!     Ok(())
//! }
//! ```

mod batch;
mod cache;
pub mod codec;
mod error;
mod hotkey;
mod lock;
mod model;
mod options;
mod single;
mod store;
pub mod stores;
mod target;
mod utils;

// Re-export public API
pub use cache::Cache;
pub use codec::CacheValue;
pub use error::CacheError;
pub use hotkey::{HotKeyPolicy, HotKeyPolicyBuilder, HotKeyPredicate, ShardKeyFn};
pub use lock::{LockGuard, Locker};
pub use model::{BatchModel, CacheModel, OriginModel};
pub use options::{CallOptions, StoreAccessCallback};
pub use store::{BackingStore, LocalCache};
pub use stores::memory::{EvictOnSetConfig, MemoryStore, MemoryStoreConfig};
pub use stores::metrics::{CacheMetric, MetricsSink, MetricsStore};
pub use stores::moka::{MokaLocalCache, MokaLocalCacheConfig};
pub use stores::redis::{RedisStore, RedisStoreConfig};
pub use target::{CacheTarget, NEGATIVE_MARKER, Shape, is_negative_marker};
pub use utils::shard_key;

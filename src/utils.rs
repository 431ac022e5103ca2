//! Shared utilities for the cache library.

use std::time::{SystemTime, UNIX_EPOCH};

/// Build a shard key for a hot key spread over `shards` copies.
///
/// Format: `{key}_{n:02}` with `n` picked at random from `0..shards`. Meant to be called from
/// a [`HotKeyPolicyBuilder::sharding`](crate::HotKeyPolicyBuilder::sharding) closure.
///
/// # Example
/// ```ignore
/// let policy = HotKeyPolicy::builder()
///     .sharding(|key| shard_key(key, 8))
///     .build()?;
/// ```
pub fn shard_key(key: &str, shards: u32) -> String {
    let n = if shards <= 1 {
        0
    } else {
        ((rand_simple() * shards as f64) as u32).min(shards - 1)
    };
    format!("{}_{:02}", key, n)
}

/// Get the current time in milliseconds since UNIX epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Simple pseudo-random number generator (0.0 to 1.0).
pub fn rand_simple() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64,
    );
    (hasher.finish() as f64) / (u64::MAX as f64)
}

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::CacheError;
use crate::store::BackingStore;

use crate::utils::{now_ms, rand_simple};

/// Configuration for eviction on set operations.
#[derive(Debug, Clone)]
pub struct EvictOnSetConfig {
    /// Provide a number between 0 and 1 to calculate whether eviction should run on each set.
    ///
    /// - `1.0` -> run eviction on every `set`
    /// - `0.5` -> run eviction on every 2nd `set` (on average)
    /// - `0.0` -> disable eviction
    pub frequency: f64,

    /// Remove items until the number of keys in the map is lower than `max_items`.
    pub max_items: usize,
}

/// Configuration for MemoryStore.
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreConfig {
    /// Remove expired keys on write operations.
    pub evict_on_set: Option<EvictOnSetConfig>,
}

#[derive(Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
}

#[derive(Clone)]
struct Slot {
    value: Value,
    /// Deadline in ms since epoch, `None` for keys without expiry.
    expires: Option<i64>,
}

impl Slot {
    fn is_live(&self, now: i64) -> bool {
        self.expires.is_none_or(|at| at > now)
    }
}

/// Thread-safe in-memory backing store with Redis key semantics.
///
/// Strings and hashes live in one keyspace. `SET` clears a key's expiry, `HSET` keeps it, and
/// touching a key with the wrong type fails the way Redis' `WRONGTYPE` does. Suitable for
/// tests, benchmarks and single-process deployments.
pub struct MemoryStore {
    state: RwLock<HashMap<String, Slot>>,
    evict_on_set: Option<EvictOnSetConfig>,
}

impl MemoryStore {
    /// Create a new MemoryStore with the given configuration.
    pub fn new(config: MemoryStoreConfig) -> Self {
        MemoryStore {
            state: RwLock::new(HashMap::new()),
            evict_on_set: config.evict_on_set,
        }
    }

    /// Remaining time to live of a key. `None` when the key is absent or never expires.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let state = self.state.read().await;
        let now = now_ms();
        let slot = state.get(key).filter(|slot| slot.is_live(now))?;
        slot.expires
            .map(|at| Duration::from_millis((at - now).max(0) as u64))
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = now_ms();
        self.state
            .read()
            .await
            .values()
            .filter(|slot| slot.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Run eviction if configured and random check passes.
    async fn maybe_evict(&self) {
        let Some(ref config) = self.evict_on_set else {
            return;
        };

        if config.frequency <= 0.0 {
            return;
        }

        let should_evict = config.frequency >= 1.0 || rand_simple() < config.frequency;
        if !should_evict {
            return;
        }

        let mut state = self.state.write().await;
        let now = now_ms();

        state.retain(|_, slot| slot.is_live(now));

        // Still over the limit: drop the keys closest to expiry, persistent keys last.
        if state.len() > config.max_items {
            let mut keys: Vec<_> = state
                .iter()
                .map(|(k, slot)| (k.clone(), slot.expires.unwrap_or(i64::MAX)))
                .collect();
            keys.sort_by_key(|(_, expires)| *expires);

            let to_remove = state.len() - config.max_items;
            for (key, _) in keys.into_iter().take(to_remove) {
                state.remove(&key);
            }
        }
    }
}

fn deadline(ttl: Duration) -> Option<i64> {
    if ttl.is_zero() {
        None
    } else {
        Some(now_ms() + ttl.as_millis() as i64)
    }
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::store(
        "memory",
        key,
        "WRONGTYPE Operation against a key holding the wrong kind of value",
    )
}

/// Live slot for `key`, dropping it first if it has expired.
fn live_slot<'a>(state: &'a mut HashMap<String, Slot>, key: &str) -> Option<&'a mut Slot> {
    let now = now_ms();
    if state.get(key).is_some_and(|slot| !slot.is_live(now)) {
        state.remove(key);
    }
    state.get_mut(key)
}

fn read_str(
    state: &HashMap<String, Slot>,
    key: &str,
    now: i64,
) -> Result<Option<String>, CacheError> {
    match state.get(key).filter(|slot| slot.is_live(now)) {
        None => Ok(None),
        Some(Slot {
            value: Value::Str(value),
            ..
        }) => Ok(Some(value.clone())),
        Some(_) => Err(wrong_type(key)),
    }
}

fn read_hash<'a>(
    state: &'a HashMap<String, Slot>,
    key: &str,
    now: i64,
) -> Result<Option<&'a HashMap<String, String>>, CacheError> {
    match state.get(key).filter(|slot| slot.is_live(now)) {
        None => Ok(None),
        Some(Slot {
            value: Value::Hash(fields),
            ..
        }) => Ok(Some(fields)),
        Some(_) => Err(wrong_type(key)),
    }
}

/// Set hash fields on a live or fresh key, then apply a non-zero `ttl` to the whole key.
fn write_hash(
    state: &mut HashMap<String, Slot>,
    key: &str,
    fields: &[(String, String)],
    ttl: Duration,
) -> Result<(), CacheError> {
    let now = now_ms();
    if state.get(key).is_some_and(|slot| !slot.is_live(now)) {
        state.remove(key);
    }
    let slot = state.entry(key.to_string()).or_insert(Slot {
        value: Value::Hash(HashMap::new()),
        expires: None,
    });

    let Value::Hash(map) = &mut slot.value else {
        return Err(wrong_type(key));
    };
    for (field, value) in fields {
        map.insert(field.clone(), value.clone());
    }
    if !ttl.is_zero() {
        slot.expires = deadline(ttl);
    }
    Ok(())
}

#[async_trait]
impl BackingStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let state = self.state.read().await;
        read_str(&state, key, now_ms())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        {
            let mut state = self.state.write().await;
            state.insert(
                key.to_string(),
                Slot {
                    value: Value::Str(value.to_string()),
                    expires: deadline(ttl),
                },
            );
        }

        self.maybe_evict().await;
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheError> {
        let state = self.state.read().await;
        Ok(read_hash(&state, key, now_ms())?.and_then(|fields| fields.get(field).cloned()))
    }

    async fn hset(
        &self,
        key: &str,
        field: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        {
            let mut state = self.state.write().await;
            write_hash(&mut state, key, &[(field.to_string(), value.to_string())], ttl)?;
        }

        self.maybe_evict().await;
        Ok(())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        let state = self.state.read().await;
        let now = now_ms();
        // MGET never fails on type: non-string keys read as absent.
        Ok(keys
            .iter()
            .map(|key| read_str(&state, key, now).ok().flatten())
            .collect())
    }

    async fn hmget(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        let state = self.state.read().await;
        let map = read_hash(&state, key, now_ms())?;
        Ok(fields
            .iter()
            .map(|field| map.and_then(|m| m.get(field).cloned()))
            .collect())
    }

    async fn mset(&self, entries: &[(String, String, Duration)]) -> Result<(), CacheError> {
        {
            let mut state = self.state.write().await;
            for (key, value, ttl) in entries {
                state.insert(
                    key.clone(),
                    Slot {
                        value: Value::Str(value.clone()),
                        expires: deadline(*ttl),
                    },
                );
            }
        }

        self.maybe_evict().await;
        Ok(())
    }

    async fn hmset(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        {
            let mut state = self.state.write().await;
            write_hash(&mut state, key, fields, ttl)?;
        }

        self.maybe_evict().await;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        for key in keys {
            state.remove(key);
        }
        Ok(())
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        let Some(slot) = live_slot(&mut state, key) else {
            return Ok(());
        };
        let Value::Hash(map) = &mut slot.value else {
            return Err(wrong_type(key));
        };
        for field in fields {
            map.remove(field);
        }
        if map.is_empty() {
            state.remove(key);
        }
        Ok(())
    }
}

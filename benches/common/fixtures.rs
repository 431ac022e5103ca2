use rand::Rng;
use serde::{Deserialize, Serialize};
use shield_cache::{BatchModel, CacheError, CacheModel, CacheTarget, CacheValue, codec};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Test data structure for benchmarks
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchUser {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub score: u32,
}

impl BenchUser {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: format!("User {}", id),
            email: format!("user{}@example.com", id),
            score: (id % 1000) as u32,
        }
    }

    /// A model carrying only its id, to be filled from the cache.
    pub fn placeholder(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

impl CacheValue for BenchUser {}

impl CacheModel for BenchUser {
    fn cache_info(&self) -> Result<CacheTarget, CacheError> {
        CacheTarget::string(user_key(self.id), Duration::from_secs(300))
    }

    fn marshal(&self) -> Result<String, CacheError> {
        codec::encode(self)
    }

    fn unmarshal(&mut self, payload: &str) -> Result<(), CacheError> {
        *self = codec::decode(payload)?;
        Ok(())
    }
}

impl BatchModel for BenchUser {
    fn update_self(&mut self, origin: Option<Self>) {
        if let Some(origin) = origin {
            *self = origin;
        }
    }
}

pub fn user_key(id: u64) -> String {
    format!("bench:user:{}", id)
}

/// Simulated database with configurable latency
#[derive(Clone)]
pub struct FakeDatabase {
    data: Arc<HashMap<u64, BenchUser>>,
    latency_ms: u64,
    query_count: Arc<AtomicUsize>,
}

impl FakeDatabase {
    pub fn new(num_users: usize, latency_ms: u64) -> Self {
        let data = (0..num_users as u64)
            .map(|id| (id, BenchUser::new(id)))
            .collect();

        Self {
            data: Arc::new(data),
            latency_ms,
            query_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn get(&self, id: u64) -> Result<Option<BenchUser>, CacheError> {
        self.query_count.fetch_add(1, Ordering::Relaxed);

        // Simulate database latency
        tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;

        Ok(self.data.get(&id).cloned())
    }

    /// One query for many users, results aligned with `ids`.
    pub async fn get_many(&self, ids: &[u64]) -> Result<Vec<Option<BenchUser>>, CacheError> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;

        Ok(ids.iter().map(|id| self.data.get(id).cloned()).collect())
    }

    #[allow(dead_code)]
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::Relaxed)
    }

    #[allow(dead_code)]
    pub fn reset_count(&self) {
        self.query_count.store(0, Ordering::Relaxed);
    }
}

/// Generate user ids for different workload patterns
pub struct KeyGenerator {
    num_keys: u64,
}

impl KeyGenerator {
    pub fn new(num_keys: u64) -> Self {
        Self { num_keys }
    }

    /// Generate sequential ids (for cold cache tests)
    pub fn sequential(&self) -> Vec<u64> {
        (0..self.num_keys).collect()
    }

    /// Generate random ids with uniform distribution
    #[allow(dead_code)]
    pub fn uniform_random(&self, count: usize) -> Vec<u64> {
        let mut rng = rand::thread_rng();
        (0..count).map(|_| rng.gen_range(0..self.num_keys)).collect()
    }

    /// Generate ids with Zipf distribution (realistic - few hot keys)
    #[allow(dead_code)]
    pub fn zipf_random(&self, count: usize) -> Vec<u64> {
        let mut rng = rand::thread_rng();
        let hot = (self.num_keys / 5).max(1);

        (0..count)
            .map(|_| {
                // Simplified Zipf: 80% of requests go to 20% of keys
                if rng.gen_bool(0.8) {
                    rng.gen_range(0..hot)
                } else {
                    rng.gen_range(hot..self.num_keys.max(hot + 1))
                }
            })
            .collect()
    }

    /// Generate ids for mixed workload (some hits, some misses)
    pub fn mixed(&self, hit_ratio: f64) -> Vec<u64> {
        let mut rng = rand::thread_rng();
        let hot_key_count = ((self.num_keys as f64 * hit_ratio) as u64).max(1);

        (0..1000)
            .map(|_| {
                if rng.gen_bool(hit_ratio) {
                    rng.gen_range(0..hot_key_count)
                } else {
                    rng.gen_range(hot_key_count..self.num_keys.max(hot_key_count + 1))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    async fn test_fake_database() {
        use super::FakeDatabase;

        let db = FakeDatabase::new(100, 10);

        let user = db.get(0).await.unwrap();
        assert_eq!(user.unwrap().id, 0);
        assert!(db.get(500).await.unwrap().is_none());

        let users = db.get_many(&[1, 500, 2]).await.unwrap();
        assert_eq!(users.len(), 3);
        assert!(users[1].is_none());

        assert_eq!(db.query_count(), 3);
    }

    #[test]
    fn test_key_generator() {
        use super::KeyGenerator;

        let key_gen = KeyGenerator::new(100);

        let seq = key_gen.sequential();
        assert_eq!(seq.len(), 100);
        assert_eq!(seq[0], 0);

        let uniform = key_gen.uniform_random(50);
        assert_eq!(uniform.len(), 50);

        let zipf = key_gen.zipf_random(100);
        assert!(zipf.iter().all(|id| *id < 100));
    }
}

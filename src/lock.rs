//! Caller-supplied mutual exclusion for stampede control.

use async_trait::async_trait;

/// Held while the stampede lock is owned. Dropping it releases the lock.
pub type LockGuard<'a> = Box<dyn Send + 'a>;

/// A mutual-exclusion capability scoped, ideally, to one logical key.
///
/// The orchestrator only needs "acquire, then release on drop", so a process-local mutex and
/// a distributed lock can be swapped without touching it. `acquire` waits as long as it takes;
/// no timeout is imposed here.
#[async_trait]
pub trait Locker: Send + Sync {
    async fn acquire<'a>(&'a self) -> LockGuard<'a>;
}

#[async_trait]
impl Locker for tokio::sync::Mutex<()> {
    async fn acquire<'a>(&'a self) -> LockGuard<'a> {
        Box::new(self.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_mutex_locker_excludes() {
        let lock: Arc<dyn Locker> = Arc::new(tokio::sync::Mutex::new(()));

        let guard = lock.acquire().await;

        let contender = lock.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.acquire().await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .unwrap()
            .unwrap();
    }
}

use std::fmt;
use std::sync::Arc;

use crate::hotkey::HotKeyPolicy;
use crate::lock::Locker;

/// Callback fired after each backing-store read, e.g. for monitoring or hot-key statistics.
pub type StoreAccessCallback = Arc<dyn Fn() + Send + Sync>;

/// Options for a single get-or-create call.
///
/// # Example
/// ```ignore
/// let lock = Arc::new(tokio::sync::Mutex::new(()));
/// let opts = CallOptions::new()
///     .with_lock(lock)
///     .cache_no_data()
///     .on_store_access(|| READS.fetch_add(1, Ordering::Relaxed));
/// ```
#[derive(Clone, Default)]
pub struct CallOptions {
    lock: Option<Arc<dyn Locker>>,
    need_cache_no_data: bool,
    on_store_access: Option<StoreAccessCallback>,
    hot_key: Option<HotKeyPolicy>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guard origin fetches with `lock` to prevent cache stampedes.
    pub fn with_lock(mut self, lock: Arc<dyn Locker>) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Store the negative marker when the origin has no data, to prevent cache penetration.
    pub fn cache_no_data(mut self) -> Self {
        self.need_cache_no_data = true;
        self
    }

    /// Register a fire-and-forget callback run after every backing-store read.
    pub fn on_store_access<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_store_access = Some(Arc::new(callback));
        self
    }

    /// Apply a hot-key policy to the call.
    pub fn with_hot_key(mut self, policy: HotKeyPolicy) -> Self {
        self.hot_key = Some(policy);
        self
    }

    pub fn lock(&self) -> Option<&Arc<dyn Locker>> {
        self.lock.as_ref()
    }

    pub fn need_cache_no_data(&self) -> bool {
        self.need_cache_no_data
    }

    pub fn hot_key(&self) -> Option<&HotKeyPolicy> {
        self.hot_key.as_ref()
    }

    /// Fire the store-access callback on a detached task.
    pub(crate) fn notify_store_access(&self) {
        if let Some(callback) = &self.on_store_access {
            let callback = callback.clone();
            tokio::spawn(async move { callback() });
        }
    }
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("lock", &self.lock.is_some())
            .field("need_cache_no_data", &self.need_cache_no_data)
            .field("on_store_access", &self.on_store_access.is_some())
            .field("hot_key", &self.hot_key)
            .finish()
    }
}

//! Capabilities a structured model implements to be cached as a whole.

use async_trait::async_trait;

use crate::error::CacheError;
use crate::target::CacheTarget;

/// A model that knows where it is cached and how to (de)serialize itself.
pub trait CacheModel: Send + Sync {
    /// Where this model is cached.
    fn cache_info(&self) -> Result<CacheTarget, CacheError>;

    /// Serialize the model. Must never return the negative marker.
    fn marshal(&self) -> Result<String, CacheError>;

    /// Replace the model's contents with a cached payload.
    fn unmarshal(&mut self, payload: &str) -> Result<(), CacheError>;
}

/// A model that can load itself from the origin.
#[async_trait]
pub trait OriginModel: CacheModel + Sized {
    /// Load the authoritative copy. `Ok(None)` means the origin has no data.
    async fn load_origin(&self) -> Result<Option<Self>, CacheError>;
}

/// A model that can be fetched in batches.
///
/// `Clone` produces the placeholders handed to the batch origin fetch, so the caller's live
/// models are only touched through `update_self` once the results have been reconciled.
pub trait BatchModel: CacheModel + Clone {
    /// Take over the origin's result. `None` means the origin has no data for this model.
    fn update_self(&mut self, origin: Option<Self>);
}

use serde::de::DeserializeOwned;

/// Error type for cache operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// A cache target or option was malformed. Raised before any I/O.
    #[error("validation error: {0}")]
    Validation(String),

    /// A backing-store or local-cache command failed.
    #[error("[{tier}] cache error for key '{key}': {message}")]
    Store {
        tier: String,
        key: String,
        message: String,
    },

    /// The local cache holds no entry for the key. Callers fall through to the backing store.
    #[error("local cache has no entry for key '{key}'")]
    LocalCacheMiss { key: String },

    /// The origin confirmed there is no data for the key.
    #[error("no data for key '{key}'")]
    NoData { key: String },

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Some cached values of a batch could not be decoded. The rest of the batch was served.
    #[error("cached values failed to decode for keys: {keys:?}")]
    BatchDecode { keys: Vec<String> },

    /// A batch origin fetch returned a different number of results than it was asked for.
    #[error("batch origin returned {actual} result(s) for {expected} missed item(s)")]
    ContractViolation { expected: usize, actual: usize },

    /// A hot-key policy was built without sharding or a local cache.
    #[error("hot-key policy needs a sharding function or a local cache")]
    HotKeyPolicy,

    /// The origin fetch failed.
    #[error("origin error: {0}")]
    Origin(String),

    /// A value was fetched from origin but writing it back to the cache failed.
    ///
    /// The encoded value is kept in `payload`; see [`CacheError::recover`].
    #[error("fetched value could not be written back: {source}")]
    WriteBack {
        payload: String,
        #[source]
        source: Box<CacheError>,
    },
}

impl CacheError {
    /// Create a new store error.
    pub fn store(
        tier: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CacheError::Store {
            tier: tier.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Wrap any displayable origin failure.
    pub fn origin(err: impl std::fmt::Display) -> Self {
        CacheError::Origin(err.to_string())
    }

    /// True for the authoritative "origin has no data" outcome.
    pub fn is_no_data(&self) -> bool {
        matches!(self, CacheError::NoData { .. })
    }

    /// Decode the value carried by a [`CacheError::WriteBack`].
    ///
    /// Returns `None` for every other variant.
    pub fn recover<V: DeserializeOwned>(&self) -> Option<Result<V, CacheError>> {
        match self {
            CacheError::WriteBack { payload, .. } => Some(crate::codec::decode(payload)),
            _ => None,
        }
    }
}

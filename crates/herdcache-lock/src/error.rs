//! Error types for lock operations.

use std::time::Duration;

use herdcache_core::CacheError;
use herdcache_store::StoreError;

/// Errors that can occur while acquiring or releasing a lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The lock could not be acquired within the configured wait bound.
    #[error("timed out acquiring lock '{name}' after {}ms", waited.as_millis())]
    Timeout { name: String, waited: Duration },

    /// The store failed while handling the lock.
    #[error("store error on lock '{name}': {source}")]
    Store {
        name: String,
        #[source]
        source: StoreError,
    },

    /// Invalid configuration.
    #[error("invalid lock configuration: {0}")]
    InvalidConfig(String),
}

impl LockError {
    /// Creates a new store error for the given lock.
    pub fn store(name: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            name: name.into(),
            source,
        }
    }

    /// Returns true if retrying the acquisition later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Store { source, .. } => source.is_transient(),
            Self::InvalidConfig(_) => false,
        }
    }
}

impl From<LockError> for CacheError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout { name, waited } => CacheError::lock_unavailable(name, waited),
            LockError::Store { .. } => CacheError::store_unavailable(err.to_string()),
            LockError::InvalidConfig(msg) => CacheError::internal(msg),
        }
    }
}

//! Error types for remote store operations.

use herdcache_core::CacheError;

/// Errors that can occur when talking to the remote store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store is not reachable.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// The Redis client reported an error.
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// An atomic script was invoked with bad keys or arguments.
    #[error("script {script} failed: {reason}")]
    Script {
        script: &'static str,
        reason: String,
    },
}

impl StoreError {
    /// Creates a new unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a new script error.
    pub fn script(script: &'static str, reason: impl Into<String>) -> Self {
        Self::Script {
            script,
            reason: reason.into(),
        }
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::Redis(e) => e.is_io_error() || e.is_connection_dropped() || e.is_timeout(),
            Self::Script { .. } => false,
        }
    }
}

impl From<StoreError> for CacheError {
    fn from(err: StoreError) -> Self {
        CacheError::store_unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::unavailable("connection refused");
        assert_eq!(err.to_string(), "store unavailable: connection refused");

        let err = StoreError::script("compare_and_delete", "missing token argument");
        assert_eq!(
            err.to_string(),
            "script compare_and_delete failed: missing token argument"
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(StoreError::unavailable("down").is_transient());
        assert!(!StoreError::script("compare_and_expire", "bad ttl").is_transient());
    }

    #[test]
    fn test_converts_to_store_unavailable() {
        let err: CacheError = StoreError::unavailable("down").into();
        assert!(err.is_store_unavailable());
    }
}

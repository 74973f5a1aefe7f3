//! Error types for herdcache.
//!
//! This module defines the error taxonomy callers of the cache observe.
//! Lower layers (codec, record source, remote store, lock manager) keep their
//! own error enums and convert into [`CacheError`] at the boundary.
//!
//! # Error Handling Philosophy
//!
//! - A caller receives either the full entity collection or one of these
//!   errors, never a partial collection.
//! - `MalformedPayload` exists in the taxonomy but the orchestrator treats it
//!   as a cache miss; it only escapes from direct codec use.
//! - Transient kinds can be retried by the caller.
//!
//! # Example
//!
//! ```
//! use herdcache_core::{CacheError, Result};
//!
//! fn load(query: &str) -> Result<usize> {
//!     if query.is_empty() {
//!         return Err(CacheError::source_unavailable("empty query"));
//!     }
//!     Ok(query.len())
//! }
//!
//! let err = load("").unwrap_err();
//! assert!(err.is_transient());
//! ```

use std::time::Duration;
use thiserror::Error;

use crate::codec::CodecError;

/// Main error type for cache operations.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The record source could not produce a result.
    #[error("source unavailable: {reason}")]
    SourceUnavailable {
        /// Description of the source failure
        reason: String,
    },

    /// A cached payload could not be decoded.
    #[error("malformed payload under '{key}': {reason}")]
    MalformedPayload {
        /// Cache key that held the payload
        key: String,
        /// Decoder message
        reason: String,
    },

    /// The distributed lock could not be acquired within the wait bound.
    #[error("lock '{name}' unavailable after {}ms", waited.as_millis())]
    LockUnavailable {
        /// Lock name that was contended
        name: String,
        /// How long the caller waited
        waited: Duration,
    },

    /// The remote store could not be reached or rejected the operation.
    #[error("store unavailable: {reason}")]
    StoreUnavailable {
        /// Description of the store failure
        reason: String,
    },

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CacheError {
    // ============================================
    // Convenience constructors
    // ============================================

    /// Creates a SourceUnavailable error.
    pub fn source_unavailable(reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates a MalformedPayload error.
    pub fn malformed_payload(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a LockUnavailable error.
    pub fn lock_unavailable(name: impl Into<String>, waited: Duration) -> Self {
        Self::LockUnavailable {
            name: name.into(),
            waited,
        }
    }

    /// Creates a StoreUnavailable error.
    pub fn store_unavailable(reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================
    // Query methods
    // ============================================

    /// Returns true if retrying the whole operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. }
                | Self::LockUnavailable { .. }
                | Self::StoreUnavailable { .. }
        )
    }

    /// Returns true if this is a lock contention error.
    pub fn is_lock_unavailable(&self) -> bool {
        matches!(self, Self::LockUnavailable { .. })
    }

    /// Returns true if this is a source error.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }

    /// Returns true if this is a store error.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}

impl From<CodecError> for CacheError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::MalformedPayload { reason } => Self::malformed_payload("", reason),
            CodecError::Encode(msg) => Self::internal(msg),
        }
    }
}

/// Type alias for Results with CacheError.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_unavailable_display() {
        let error = CacheError::lock_unavailable("students:lock:all", Duration::from_millis(1500));
        let msg = error.to_string();

        assert!(msg.contains("students:lock:all"));
        assert!(msg.contains("1500ms"));
    }

    #[test]
    fn test_is_transient() {
        assert!(CacheError::source_unavailable("db down").is_transient());
        assert!(CacheError::store_unavailable("refused").is_transient());
        assert!(CacheError::lock_unavailable("l", Duration::ZERO).is_transient());
        assert!(!CacheError::malformed_payload("k", "bad").is_transient());
        assert!(!CacheError::internal("boom").is_transient());
    }

    #[test]
    fn test_codec_error_conversion() {
        let error: CacheError = CodecError::malformed("expected array").into();
        assert!(matches!(error, CacheError::MalformedPayload { .. }));

        let error: CacheError = CodecError::Encode("nope".into()).into();
        assert!(matches!(error, CacheError::Internal(_)));
    }

    #[test]
    fn test_result_with_question_mark() {
        fn inner() -> Result<()> {
            Err(CacheError::source_unavailable("test"))
        }

        fn outer() -> Result<String> {
            inner()?;
            Ok("success".into())
        }

        assert!(outer().unwrap_err().is_source_unavailable());
    }
}

//! Record source trait definition.

use async_trait::async_trait;

use crate::entity::Student;
use crate::error::CacheError;

/// Errors that can occur while fetching from a record source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source is not reachable or rejected the query.
    #[error("source unavailable: {reason}")]
    Unavailable { reason: String },

    /// The source did not answer in time.
    #[error("source query timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

impl SourceError {
    /// Creates a new unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

impl From<SourceError> for CacheError {
    fn from(err: SourceError) -> Self {
        CacheError::source_unavailable(err.to_string())
    }
}

/// An authoritative source of student records.
///
/// # Example
///
/// ```ignore
/// use herdcache_core::{RecordSource, SourceError, Student};
///
/// struct Database;
///
/// #[async_trait]
/// impl RecordSource for Database {
///     async fn fetch(&self, query: &str) -> Result<Vec<Student>, SourceError> {
///         // SELECT ... WHERE ...
///     }
///
///     fn name(&self) -> &str {
///         "database"
///     }
/// }
/// ```
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetches the ordered collection of students matching `query`.
    ///
    /// An empty collection is a valid answer and is cached like any other.
    ///
    /// # Errors
    ///
    /// - `SourceError::Unavailable` if the source cannot be queried
    /// - `SourceError::Timeout` if the source did not answer in time
    async fn fetch(&self, query: &str) -> Result<Vec<Student>, SourceError>;

    /// Returns the name of this source, used for logging.
    fn name(&self) -> &str;

    /// Performs a health check on the source.
    async fn health_check(&self) -> Result<(), SourceError> {
        Ok(())
    }
}

//! In-memory record source used by the demo binary and the test suites.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{RecordSource, SourceError};
use crate::entity::{Sex, Student};

/// A record source backed by a fixed table of query results.
///
/// Every call to [`RecordSource::fetch`] is counted, which lets tests assert
/// how many times the cache fell through to the source. Unknown queries yield
/// an empty collection.
#[derive(Debug, Default)]
pub struct StaticSource {
    records: HashMap<String, Vec<Student>>,
    latency: Option<Duration>,
    failing: AtomicBool,
    fetches: AtomicU64,
}

impl StaticSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source holding the reference student list under `all`.
    pub fn reference() -> Self {
        Self::new().with_records("all", reference_students())
    }

    /// Registers the result for a query.
    pub fn with_records(mut self, query: impl Into<String>, students: Vec<Student>) -> Self {
        self.records.insert(query.into(), students);
        self
    }

    /// Simulates a slow query.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes subsequent fetches fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns how many fetches were issued.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}

/// The students returned for the `all` query.
pub(crate) fn reference_students() -> Vec<Student> {
    vec![
        Student::new("zhangsan1", 23, Sex::Man),
        Student::new("zhangsan2", 24, Sex::Man),
        Student::new("zhangsan3", 25, Sex::Man),
    ]
}

#[async_trait]
impl RecordSource for StaticSource {
    async fn fetch(&self, query: &str) -> Result<Vec<Student>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        debug!(query = %query, "Querying static source");

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::unavailable("static source is failing"));
        }

        Ok(self.records.get(query).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "static"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::unavailable("static source is failing"));
        }
        Ok(())
    }
}

//! Application state.

use std::sync::Arc;

use crate::cache::CacheOrchestrator;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The cache in front of the record source.
    cache: Arc<CacheOrchestrator>,
}

impl AppState {
    /// Creates a new AppState with the given orchestrator.
    pub fn new(cache: Arc<CacheOrchestrator>) -> Self {
        Self { cache }
    }

    /// Returns a reference to the orchestrator.
    pub fn cache(&self) -> &CacheOrchestrator {
        self.cache.as_ref()
    }
}

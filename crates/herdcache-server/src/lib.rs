//! Herdcache Server - HTTP front of the student cache
//!
//! This crate wires the cache orchestrator to an Axum router and provides
//! the layered settings, metrics and middleware the binary runs with.

pub mod cache;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod settings;
pub mod state;

pub use cache::{CacheConfig, CacheOrchestrator, LockScope, PollingConfig, Strategy};
pub use error::AppError;
pub use server::{create_router, run_server};
pub use settings::{Settings, SettingsError, StoreBackend};
pub use state::AppState;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

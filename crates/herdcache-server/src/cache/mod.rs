//! Cache module for the herdcache server.
//!
//! This module holds the read paths that sit between HTTP callers and the
//! record source: a process-local Moka cache and four remote-store strategies
//! of increasing protection against penetration, avalanche and breakdown.

pub mod config;
pub mod keys;
pub mod local;
pub mod orchestrator;
pub mod strategy;

// Re-exports
pub use config::{CacheConfig, PollingConfig};
pub use keys::CacheKey;
pub use local::LocalCache;
pub use orchestrator::CacheOrchestrator;
pub use strategy::{LockScope, ParseSelectorError, Strategy};

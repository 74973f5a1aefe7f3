//! # Herdcache Store
//!
//! Remote cache store abstraction for herdcache.
//!
//! The cache and the distributed lock both live in a shared key-value store
//! with per-key TTLs. This crate defines the operations the rest of the
//! workspace needs from such a store and ships two backends:
//!
//! - [`RedisStore`] for real multi-process deployments
//! - [`MemoryStore`] for tests and single-node demos, with failure injection
//!
//! ## Example
//!
//! ```ignore
//! use herdcache_store::{RedisStore, RemoteStore};
//!
//! let store = RedisStore::connect("redis://127.0.0.1:6379").await?;
//! store.set("greeting", "hello", Some(Duration::from_secs(60))).await?;
//! ```

pub mod error;
pub mod memory;
pub mod redis_store;
pub mod script;
pub mod traits;

// Re-exports
pub use error::StoreError;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use script::AtomicScript;
pub use traits::RemoteStore;

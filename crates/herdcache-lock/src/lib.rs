//! # Herdcache Lock
//!
//! Distributed mutual exclusion on top of a [`RemoteStore`](herdcache_store::RemoteStore).
//!
//! A lock is a key in the shared store whose value is a random token minted
//! by the holder. Acquisition is an atomic set-if-absent with a lease TTL;
//! release is an atomic compare-and-delete, so a holder can never delete a
//! lock that has since been taken over by someone else.
//!
//! ## Features
//!
//! - Jittered exponential backoff while waiting, with an optional upper bound
//! - Early wake-up of local waiters when a lock held in this process is released
//! - Lease renewal ("watchdog") while the critical section is running
//! - Reentrant acquisition per [`HolderId`]
//! - Release on drop, so cancelled callers do not leak a held lock
//!
//! ## Example
//!
//! ```ignore
//! use herdcache_lock::{HolderId, LockConfig, LockManager};
//!
//! let locks = LockManager::new(store, LockConfig::default());
//! let holder = HolderId::new();
//!
//! let guard = locks.lock("students:lock:all", &holder).await?;
//! // critical section
//! guard.release().await?;
//! ```

mod backoff;
pub mod config;
pub mod error;
pub mod manager;
pub mod token;
pub mod watchdog;

// Re-exports
pub use config::{LockConfig, LockConfigBuilder};
pub use error::LockError;
pub use manager::{LockGuard, LockManager, ReleaseOutcome};
pub use token::{HolderId, LockToken};
pub use watchdog::{LeaseState, Watchdog, WatchdogHandle};

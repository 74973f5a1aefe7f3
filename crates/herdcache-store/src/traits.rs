//! Remote store trait definition.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::script::AtomicScript;

/// A shared key-value store with per-key TTLs.
///
/// Implementations must make every method atomic with respect to the single
/// key it touches; [`RemoteStore::eval_atomic`] must run the whole script
/// atomically.
///
/// # Implementors
///
/// - `RedisStore` - talks to a Redis server
/// - `MemoryStore` - process-local map, for tests
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// `ttl = None` stores the value without expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Stores `value` under `key` only if the key is absent.
    ///
    /// Returns `true` if the value was written.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Deletes `key`. Returns `true` if a value was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Runs one of the atomic scripts and returns its integer reply.
    async fn eval_atomic(
        &self,
        script: AtomicScript,
        keys: &[&str],
        args: &[&str],
    ) -> Result<i64, StoreError>;

    /// Returns the remaining TTL of `key`.
    ///
    /// `None` means the key is absent or has no expiry.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

    /// Performs a health check on the store.
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Returns the name of this store, used for logging.
    fn name(&self) -> &str;
}

/// Validates script arity before dispatch.
pub(crate) fn check_arity(
    script: AtomicScript,
    keys: &[&str],
    args: &[&str],
) -> Result<(), StoreError> {
    if keys.len() != script.key_count() {
        return Err(StoreError::script(
            script.name(),
            format!("expected {} keys, got {}", script.key_count(), keys.len()),
        ));
    }
    if args.len() != script.arg_count() {
        return Err(StoreError::script(
            script.name(),
            format!("expected {} args, got {}", script.arg_count(), args.len()),
        ));
    }
    Ok(())
}

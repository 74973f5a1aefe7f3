//! Cache key and lock name derivation.

use std::fmt;

use super::strategy::LockScope;

/// Key of one cached query result in the remote store.
///
/// Entries live under `<prefix>:data:<query>` and lock names under
/// `<prefix>:lock`, so a query can never name a lock key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    prefix: String,
    query: String,
}

impl CacheKey {
    /// Creates a key for `query` under `prefix`.
    ///
    /// # Examples
    ///
    /// ```
    /// use herdcache_server::cache::{CacheKey, LockScope};
    ///
    /// let key = CacheKey::new("students", "all");
    /// assert_eq!(key.entry_key(), "students:data:all");
    /// assert_eq!(key.lock_name(LockScope::PerKey), "students:lock:all");
    /// assert_eq!(key.lock_name(LockScope::Global), "students:lock");
    /// ```
    pub fn new(prefix: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            query: query.into(),
        }
    }

    /// Returns the prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the query passed to the record source.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the store key holding the serialized collection.
    pub fn entry_key(&self) -> String {
        format!("{}:data:{}", self.prefix, self.query)
    }

    /// Returns the lock name guarding this key's population.
    pub fn lock_name(&self, scope: LockScope) -> String {
        match scope {
            LockScope::PerKey => format!("{}:lock:{}", self.prefix, self.query),
            LockScope::Global => format!("{}:lock", self.prefix),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.query)
    }
}

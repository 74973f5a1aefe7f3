//! Cache behaviour configuration.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::strategy::{LockScope, Strategy};

/// Configuracion del cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Namespace for every key this service writes.
    pub prefix: String,
    /// Read path used by `get_entities`.
    pub strategy: Strategy,
    /// Lock granularity for the single-flight strategy.
    pub lock_scope: LockScope,
    /// Base TTL of a non-empty entry.
    #[serde(with = "humantime_serde")]
    pub entry_ttl: Duration,
    /// Upper bound of the random extra TTL added to non-empty entries.
    #[serde(with = "humantime_serde")]
    pub ttl_jitter: Duration,
    /// TTL of an empty (negative) entry.
    #[serde(with = "humantime_serde")]
    pub negative_ttl: Duration,
    /// Maximo numero de entries del cache local.
    pub local_capacity: u64,
    /// TTL of the process-local cache.
    #[serde(with = "humantime_serde")]
    pub local_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: "students".to_string(),
            strategy: Strategy::default(),
            lock_scope: LockScope::default(),
            entry_ttl: Duration::from_secs(300),
            ttl_jitter: Duration::from_secs(60),
            negative_ttl: Duration::from_secs(30),
            local_capacity: 10_000,
            local_ttl: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Returns a copy with a different strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Returns a copy with a different lock scope.
    pub fn with_lock_scope(mut self, scope: LockScope) -> Self {
        self.lock_scope = scope;
        self
    }

    /// Returns the TTL for a non-empty entry: `entry_ttl` plus a uniform
    /// random share of `ttl_jitter`, so entries written together expire apart.
    pub fn jittered_ttl(&self) -> Duration {
        let jitter_ms = self.ttl_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.entry_ttl;
        }
        self.entry_ttl + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }

    /// Returns the TTL to write for `len` fetched records.
    pub fn ttl_for(&self, len: usize) -> Duration {
        if len == 0 {
            self.negative_ttl
        } else {
            self.jittered_ttl()
        }
    }
}

/// Settings of the fixed-TTL polling lock strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// TTL set on the lock key. Never renewed.
    #[serde(with = "humantime_serde")]
    pub lock_ttl: Duration,
    /// Fixed delay between attempts.
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    /// Attempts before giving up with `LockUnavailable`.
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(300),
            retry_delay: Duration::from_millis(300),
            max_attempts: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.prefix, "students");
        assert_eq!(config.strategy, Strategy::SingleFlight);
        assert_eq!(config.negative_ttl, Duration::from_secs(30));

        let polling = PollingConfig::default();
        assert_eq!(polling.retry_delay, Duration::from_millis(300));
        assert_eq!(polling.max_attempts, 100);
    }

    #[test]
    fn test_jittered_ttl_bounds() {
        let config = CacheConfig::default();
        for _ in 0..100 {
            let ttl = config.jittered_ttl();
            assert!(ttl >= config.entry_ttl);
            assert!(ttl <= config.entry_ttl + config.ttl_jitter);
        }
    }

    #[test]
    fn test_jitter_spreads_expiry() {
        let config = CacheConfig::default();
        let ttls: std::collections::HashSet<_> = (0..50).map(|_| config.jittered_ttl()).collect();
        assert!(ttls.len() > 1);
    }

    #[test]
    fn test_empty_results_use_negative_ttl() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl_for(0), Duration::from_secs(30));
        assert!(config.ttl_for(3) >= config.entry_ttl);
    }

    #[test]
    fn test_zero_jitter() {
        let config = CacheConfig {
            ttl_jitter: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(config.jittered_ttl(), config.entry_ttl);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: CacheConfig = serde_json::from_str(
            r#"{ "strategy": "polling-lock", "entry_ttl": "10m", "lock_scope": "global" }"#,
        )
        .unwrap();

        assert_eq!(config.strategy, Strategy::PollingLock);
        assert_eq!(config.lock_scope, LockScope::Global);
        assert_eq!(config.entry_ttl, Duration::from_secs(600));
        assert_eq!(config.prefix, "students");
    }
}

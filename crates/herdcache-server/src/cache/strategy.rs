//! Strategy and lock scope selectors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How `get_entities` resolves a query.
///
/// Every variant is a complete read path; only `SingleFlight` guarantees at
/// most one source fetch per key across processes.
///
/// Names are kebab-case; `_` is accepted in place of `-` when parsing or
/// deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum Strategy {
    /// In-process cache only. Never touches the remote store.
    LocalProcess,
    /// Remote read-through with no stampede protection.
    NaiveRemote,
    /// Remote read-through with empty-result caching, jittered TTLs and a
    /// process-local mutex.
    NegativeCache,
    /// Remote read-through under a fixed-TTL lock polled at a fixed delay.
    PollingLock,
    /// Remote read-through under the distributed lock manager.
    #[default]
    SingleFlight,
}

impl Strategy {
    /// All strategies, in order of increasing protection.
    pub const ALL: [Strategy; 5] = [
        Strategy::LocalProcess,
        Strategy::NaiveRemote,
        Strategy::NegativeCache,
        Strategy::PollingLock,
        Strategy::SingleFlight,
    ];

    /// Returns the configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::LocalProcess => "local-process",
            Strategy::NaiveRemote => "naive-remote",
            Strategy::NegativeCache => "negative-cache",
            Strategy::PollingLock => "polling-lock",
            Strategy::SingleFlight => "single-flight",
        }
    }

    /// Returns true if the strategy reads or writes the remote store.
    pub fn uses_remote_store(&self) -> bool {
        !matches!(self, Strategy::LocalProcess)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ParseSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == normalized)
            .ok_or_else(|| ParseSelectorError::new("strategy", s))
    }
}

impl TryFrom<String> for Strategy {
    type Error = ParseSelectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Which lock name a cache key contends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum LockScope {
    /// One lock per query key.
    #[default]
    PerKey,
    /// One lock for every key under the prefix.
    Global,
}

impl LockScope {
    /// Returns the configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LockScope::PerKey => "per-key",
            LockScope::Global => "global",
        }
    }
}

impl fmt::Display for LockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockScope {
    type Err = ParseSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "per-key" => Ok(LockScope::PerKey),
            "global" => Ok(LockScope::Global),
            _ => Err(ParseSelectorError::new("lock scope", s)),
        }
    }
}

impl TryFrom<String> for LockScope {
    type Error = ParseSelectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Error when parsing a strategy or lock scope name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseSelectorError {
    kind: &'static str,
    value: String,
}

impl ParseSelectorError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

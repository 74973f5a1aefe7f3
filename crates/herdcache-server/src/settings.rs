//! Layered service settings.
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. a config file: `$HERDCACHE_CONFIG` if set, otherwise an optional
//!    `herdcache.{toml,yaml,json}` in the working directory
//! 3. environment variables such as `HERDCACHE__CACHE__STRATEGY=polling-lock`

use std::net::{IpAddr, SocketAddr};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use herdcache_lock::LockConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::cache::{CacheConfig, PollingConfig};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "HERDCACHE_CONFIG";

/// Base name of the optional config file.
const DEFAULT_CONFIG_FILE: &str = "herdcache";

/// Prefix of environment overrides.
const ENV_PREFIX: &str = "HERDCACHE";

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// All service settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub cache: CacheConfig,
    pub lock: LockConfig,
    pub polling: PollingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerSettings {
    /// Returns the socket address to bind.
    pub fn addr(&self) -> Result<SocketAddr, SettingsError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| SettingsError::Invalid(format!("invalid host '{}'", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Which remote store backs the cache and the locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    /// Process-local store. Locks only exclude within this process.
    Memory,
}

/// Remote store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub redis_url: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from the config file and the environment.
    pub fn load() -> Result<Self, SettingsError> {
        let file = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => File::with_name(&path).required(true),
            Err(_) => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = Config::builder().add_source(file).add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );

        Self::from_builder(builder)
    }

    /// Builds and validates settings from prepared sources.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks cross-field invariants.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.lock
            .validate()
            .map_err(|e| SettingsError::Invalid(e.to_string()))?;

        if self.cache.prefix.trim().is_empty() {
            return Err(SettingsError::Invalid("cache.prefix cannot be empty".into()));
        }
        if self.cache.entry_ttl.is_zero() || self.cache.negative_ttl.is_zero() {
            return Err(SettingsError::Invalid("cache TTLs must be positive".into()));
        }
        if self.polling.max_attempts == 0 {
            return Err(SettingsError::Invalid(
                "polling.max_attempts must be at least 1".into(),
            ));
        }
        if self.polling.lock_ttl.is_zero() {
            return Err(SettingsError::Invalid("polling.lock_ttl must be positive".into()));
        }
        self.server.addr()?;
        Ok(())
    }
}

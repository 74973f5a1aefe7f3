//! Lock manager configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LockError;

/// Largest accepted backoff multiplier.
pub const MAX_BACKOFF_MULTIPLIER: f64 = 16.0;

/// Configuration for the lock manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Default lease attached to a lock key.
    #[serde(default = "default_lease", with = "humantime_serde")]
    lease: Duration,

    /// How often the watchdog renews the lease. Defaults to a third of the lease.
    #[serde(default, with = "humantime_serde")]
    renew_interval: Option<Duration>,

    /// Upper bound on how long `acquire` waits. `None` waits indefinitely.
    #[serde(default = "default_acquire_timeout", with = "humantime_serde")]
    acquire_timeout: Option<Duration>,

    /// First delay between acquisition attempts.
    #[serde(default = "default_initial_backoff", with = "humantime_serde")]
    initial_backoff: Duration,

    /// Largest delay between acquisition attempts.
    #[serde(default = "default_max_backoff", with = "humantime_serde")]
    max_backoff: Duration,

    /// Growth factor applied to the delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    backoff_multiplier: f64,

    /// Whether held leases are renewed in the background.
    #[serde(default = "default_true")]
    watchdog: bool,
}

fn default_lease() -> Duration {
    Duration::from_secs(30)
}

fn default_acquire_timeout() -> Option<Duration> {
    Some(Duration::from_secs(10))
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(50)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(1)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lease: default_lease(),
            renew_interval: None,
            acquire_timeout: default_acquire_timeout(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            backoff_multiplier: default_backoff_multiplier(),
            watchdog: true,
        }
    }
}

impl LockConfig {
    /// Creates a new builder for LockConfig.
    pub fn builder() -> LockConfigBuilder {
        LockConfigBuilder::default()
    }

    /// Returns the default lease.
    pub fn lease(&self) -> Duration {
        self.lease
    }

    /// Returns the configured renewal interval, if any.
    pub fn renew_interval(&self) -> Option<Duration> {
        self.renew_interval
    }

    /// Returns the renewal interval to use for a lease of the given length.
    ///
    /// A configured interval is only honoured when it is shorter than the
    /// lease; otherwise the lease would lapse between renewals.
    pub fn renew_interval_for(&self, lease: Duration) -> Duration {
        match self.renew_interval {
            Some(interval) if interval < lease && !interval.is_zero() => interval,
            _ => (lease / 3).max(Duration::from_millis(1)),
        }
    }

    /// Returns the acquisition wait bound.
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout
    }

    /// Returns the first backoff delay.
    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// Returns the largest backoff delay.
    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Returns the backoff growth factor.
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Returns whether the watchdog is enabled.
    pub fn watchdog(&self) -> bool {
        self.watchdog
    }

    /// Checks the invariants between fields.
    pub fn validate(&self) -> Result<(), LockError> {
        if self.lease.is_zero() {
            return Err(LockError::InvalidConfig("lease must be positive".into()));
        }
        if let Some(interval) = self.renew_interval
            && interval >= self.lease
        {
            return Err(LockError::InvalidConfig(format!(
                "renew interval {interval:?} must be shorter than the lease {:?}",
                self.lease
            )));
        }
        if self.initial_backoff > self.max_backoff {
            return Err(LockError::InvalidConfig(
                "initial backoff cannot exceed max backoff".into(),
            ));
        }
        if !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&self.backoff_multiplier) {
            return Err(LockError::InvalidConfig(format!(
                "backoff multiplier must be between 1.0 and {MAX_BACKOFF_MULTIPLIER}"
            )));
        }
        Ok(())
    }
}

/// Builder for LockConfig.
#[derive(Debug, Default)]
pub struct LockConfigBuilder {
    lease: Option<Duration>,
    renew_interval: Option<Duration>,
    acquire_timeout: Option<Option<Duration>>,
    initial_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
    backoff_multiplier: Option<f64>,
    watchdog: Option<bool>,
}

impl LockConfigBuilder {
    /// Sets the default lease.
    pub fn lease(mut self, lease: Duration) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Sets the watchdog renewal interval.
    pub fn renew_interval(mut self, interval: Duration) -> Self {
        self.renew_interval = Some(interval);
        self
    }

    /// Sets the acquisition wait bound.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(Some(timeout));
        self
    }

    /// Makes `acquire` wait until the lock becomes available.
    pub fn wait_indefinitely(mut self) -> Self {
        self.acquire_timeout = Some(None);
        self
    }

    /// Sets the backoff bounds.
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = Some(initial);
        self.max_backoff = Some(max);
        self
    }

    /// Sets the backoff growth factor.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    /// Enables or disables lease renewal.
    pub fn watchdog(mut self, enabled: bool) -> Self {
        self.watchdog = Some(enabled);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<LockConfig, LockError> {
        let defaults = LockConfig::default();
        let config = LockConfig {
            lease: self.lease.unwrap_or(defaults.lease),
            renew_interval: self.renew_interval,
            acquire_timeout: self.acquire_timeout.unwrap_or(defaults.acquire_timeout),
            initial_backoff: self.initial_backoff.unwrap_or(defaults.initial_backoff),
            max_backoff: self.max_backoff.unwrap_or(defaults.max_backoff),
            backoff_multiplier: self
                .backoff_multiplier
                .unwrap_or(defaults.backoff_multiplier),
            watchdog: self.watchdog.unwrap_or(defaults.watchdog),
        };
        config.validate()?;
        Ok(config)
    }
}

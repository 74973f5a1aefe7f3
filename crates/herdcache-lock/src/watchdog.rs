//! Lease renewal for held locks.
//!
//! While a guard is alive its lease is pushed forward every `interval` with
//! an atomic compare-and-expire, so a long critical section does not outlive
//! its lease. Renewal stops when the handle is dropped, or on its own once
//! the store reports that the token no longer owns the key.

use std::sync::Arc;
use std::time::Duration;

use herdcache_store::{AtomicScript, RemoteStore};
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

use crate::token::LockToken;

/// Renewal state of one held lease.
#[derive(Debug, Default)]
pub struct LeaseState {
    /// Number of successful renewals.
    renewals: RwLock<u64>,
    /// Number of consecutive failed renewals.
    failure_count: RwLock<u32>,
    /// The last renewal error, if any.
    last_error: RwLock<Option<String>>,
    /// When the lease was last renewed.
    last_renewal: RwLock<Option<Instant>>,
    /// Set once the token was found not to own the key anymore.
    lost: RwLock<bool>,
}

impl LeaseState {
    /// Creates a fresh state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful renewal.
    pub fn record_renewal(&self) {
        let mut renewals = self.renewals.write();
        let mut failure_count = self.failure_count.write();
        let mut last_error = self.last_error.write();
        let mut last_renewal = self.last_renewal.write();

        *renewals += 1;
        *failure_count = 0;
        *last_error = None;
        *last_renewal = Some(Instant::now());
    }

    /// Records a failed renewal.
    pub fn record_failure(&self, error: impl Into<String>) {
        let mut last_error = self.last_error.write();
        let mut failure_count = self.failure_count.write();

        *last_error = Some(error.into());
        *failure_count += 1;
    }

    /// Marks the lease as lost.
    pub fn mark_lost(&self) {
        *self.lost.write() = true;
    }

    /// Returns the number of successful renewals.
    pub fn renewals(&self) -> u64 {
        *self.renewals.read()
    }

    /// Returns the number of consecutive failures.
    pub fn failure_count(&self) -> u32 {
        *self.failure_count.read()
    }

    /// Returns the last renewal error.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Returns when the lease was last renewed.
    pub fn last_renewal(&self) -> Option<Instant> {
        *self.last_renewal.read()
    }

    /// Returns true if the lease is known to be lost.
    pub fn is_lost(&self) -> bool {
        *self.lost.read()
    }

    /// Returns true if the lease is held and the last renewal succeeded.
    pub fn is_healthy(&self) -> bool {
        !self.is_lost() && self.last_error.read().is_none()
    }
}

/// Handle for a running watchdog. Dropping it stops renewal.
#[derive(Debug)]
pub struct WatchdogHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl WatchdogHandle {
    /// Signals the watchdog to stop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Background task that renews one lease.
pub struct Watchdog {
    store: Arc<dyn RemoteStore>,
    lock_name: String,
    token: LockToken,
    lease: Duration,
    interval: Duration,
    state: Arc<LeaseState>,
}

impl Watchdog {
    /// Creates a watchdog for the lease identified by `lock_name` and `token`.
    pub fn new(
        store: Arc<dyn RemoteStore>,
        lock_name: impl Into<String>,
        token: LockToken,
        lease: Duration,
        interval: Duration,
        state: Arc<LeaseState>,
    ) -> Self {
        Self {
            store,
            lock_name: lock_name.into(),
            token,
            lease,
            interval,
            state,
        }
    }

    /// Spawns the renewal task on the current runtime.
    pub fn start(self) -> WatchdogHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(self.run(shutdown_rx));
        WatchdogHandle { shutdown_tx }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            lock = %self.lock_name,
            interval_ms = self.interval.as_millis() as u64,
            "Lease watchdog started"
        );

        loop {
            tokio::select! {
                biased;
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if !self.renew_once().await {
                        break;
                    }
                }
            }
        }

        debug!(lock = %self.lock_name, renewals = self.state.renewals(), "Lease watchdog stopped");
    }

    /// Renews the lease once. Returns false when renewal should stop.
    async fn renew_once(&self) -> bool {
        let lease_ms = self.lease.as_millis().max(1).to_string();
        let result = self
            .store
            .eval_atomic(
                AtomicScript::CompareAndExpire,
                &[&self.lock_name],
                &[self.token.as_str(), &lease_ms],
            )
            .await;

        match result {
            Ok(1) => {
                self.state.record_renewal();
                true
            },
            Ok(_) => {
                warn!(lock = %self.lock_name, "Lease lost before renewal, stopping watchdog");
                self.state.mark_lost();
                false
            },
            Err(e) => {
                warn!(lock = %self.lock_name, error = %e, "Lease renewal failed");
                self.state.record_failure(e.to_string());
                true
            },
        }
    }
}

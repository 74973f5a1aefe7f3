//! Lock acquisition, reentrancy and release.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use herdcache_store::{AtomicScript, RemoteStore};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::backoff::Backoff;
use crate::config::LockConfig;
use crate::error::LockError;
use crate::token::{HolderId, LockToken};
use crate::watchdog::{LeaseState, Watchdog, WatchdogHandle};

/// Result of releasing a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The lock key was deleted.
    Released,
    /// The holder still has outer acquisitions on this lock.
    StillHeld { remaining: usize },
    /// The lock key no longer carried this guard's token; nothing was deleted.
    NotOwned,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HoldKey {
    name: String,
    holder: HolderId,
}

/// One real acquisition, shared by every nested guard of the same holder.
struct Hold {
    token: LockToken,
    count: usize,
    lease: Duration,
    state: Arc<LeaseState>,
    _watchdog: Option<WatchdogHandle>,
}

struct Inner {
    store: Arc<dyn RemoteStore>,
    config: LockConfig,
    holds: Mutex<HashMap<HoldKey, Hold>>,
    wakeups: Mutex<HashMap<String, Arc<Notify>>>,
}

impl Inner {
    /// Drops one hold count. Returns the counts left, or `None` if the guard's
    /// hold is gone (already replaced or never registered).
    fn detach(&self, key: &HoldKey, token: &LockToken) -> Option<usize> {
        let mut holds = self.holds.lock();
        let hold = holds.get_mut(key).filter(|h| &h.token == token)?;
        hold.count -= 1;
        let remaining = hold.count;
        if remaining == 0 {
            // Dropping the hold stops its watchdog.
            holds.remove(key);
        }
        Some(remaining)
    }

    async fn delete_if_owned(
        &self,
        name: &str,
        token: &LockToken,
    ) -> Result<ReleaseOutcome, LockError> {
        let result = self
            .store
            .eval_atomic(AtomicScript::CompareAndDelete, &[name], &[token.as_str()])
            .await;
        self.wake(name);

        match result.map_err(|e| LockError::store(name, e))? {
            1 => {
                debug!(lock = name, "Lock released");
                Ok(ReleaseOutcome::Released)
            },
            _ => {
                warn!(lock = name, "Lock was no longer owned at release");
                Ok(ReleaseOutcome::NotOwned)
            },
        }
    }

    fn wake(&self, name: &str) {
        let mut wakeups = self.wakeups.lock();
        match wakeups.get(name) {
            Some(notify) if Arc::strong_count(notify) == 1 => {
                wakeups.remove(name);
            },
            Some(notify) => notify.notify_waiters(),
            None => {},
        }
    }
}

/// Registration of a waiting `acquire` call for local release notifications.
struct Waiter<'a> {
    inner: &'a Inner,
    name: &'a str,
    notify: Arc<Notify>,
}

impl<'a> Waiter<'a> {
    fn register(inner: &'a Inner, name: &'a str) -> Self {
        let notify = inner
            .wakeups
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();
        Self {
            inner,
            name,
            notify,
        }
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        let mut wakeups = self.inner.wakeups.lock();
        // Ours plus the table's.
        if Arc::strong_count(&self.notify) == 2 {
            wakeups.remove(self.name);
        }
    }
}

/// Hands out distributed locks backed by a [`RemoteStore`].
///
/// A manager is cheap to clone; clones share the same hold table, so
/// reentrancy and local wake-ups work across them. Independent processes
/// each run their own manager against the same store.
#[derive(Clone)]
pub struct LockManager {
    inner: Arc<Inner>,
}

impl LockManager {
    /// Creates a new lock manager.
    pub fn new(store: Arc<dyn RemoteStore>, config: LockConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                holds: Mutex::new(HashMap::new()),
                wakeups: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &LockConfig {
        &self.inner.config
    }

    /// Acquires `name` with the configured default lease.
    pub async fn lock(&self, name: &str, holder: &HolderId) -> Result<LockGuard, LockError> {
        self.acquire(name, holder, self.inner.config.lease()).await
    }

    /// Acquires `name`, waiting with jittered exponential backoff.
    ///
    /// Waiters wake early when a holder in this process releases the same
    /// lock. Fails with [`LockError::Timeout`] once the configured acquire
    /// timeout has elapsed. Dropping the future stops waiting.
    pub async fn acquire(
        &self,
        name: &str,
        holder: &HolderId,
        lease: Duration,
    ) -> Result<LockGuard, LockError> {
        let config = &self.inner.config;
        let started = Instant::now();
        let mut backoff = Backoff::new(
            config.initial_backoff(),
            config.max_backoff(),
            config.backoff_multiplier(),
        );
        let waiter = Waiter::register(&self.inner, name);

        loop {
            let notified = waiter.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(guard) = self.try_acquire(name, holder, lease).await? {
                return Ok(guard);
            }

            let waited = started.elapsed();
            let mut delay = backoff.next_delay();
            if let Some(timeout) = config.acquire_timeout() {
                if waited >= timeout {
                    warn!(lock = name, waited_ms = waited.as_millis() as u64, "Lock acquisition timed out");
                    return Err(LockError::Timeout {
                        name: name.to_string(),
                        waited,
                    });
                }
                delay = delay.min(timeout - waited);
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                _ = &mut notified => {
                    debug!(lock = name, "Woken by local release");
                },
            }
        }
    }

    /// Makes a single acquisition attempt.
    ///
    /// Returns `None` if another holder owns the lock. A holder that already
    /// owns it re-enters and gets a nested guard.
    pub async fn try_acquire(
        &self,
        name: &str,
        holder: &HolderId,
        lease: Duration,
    ) -> Result<Option<LockGuard>, LockError> {
        let key = HoldKey {
            name: name.to_string(),
            holder: holder.clone(),
        };

        if let Some(guard) = self.reenter(&key).await? {
            return Ok(Some(guard));
        }

        let token = LockToken::mint();
        let acquired = self
            .inner
            .store
            .set_if_absent(name, token.as_str(), lease)
            .await
            .map_err(|e| LockError::store(name, e))?;
        if !acquired {
            return Ok(None);
        }

        let state = Arc::new(LeaseState::new());
        let watchdog = self.inner.config.watchdog().then(|| {
            Watchdog::new(
                self.inner.store.clone(),
                name,
                token.clone(),
                lease,
                self.inner.config.renew_interval_for(lease),
                state.clone(),
            )
            .start()
        });

        self.inner.holds.lock().insert(
            key.clone(),
            Hold {
                token: token.clone(),
                count: 1,
                lease,
                state: state.clone(),
                _watchdog: watchdog,
            },
        );

        debug!(lock = name, holder = %holder, "Lock acquired");
        Ok(Some(self.guard(key, token, state)))
    }

    /// Re-enters a lock this holder already owns, after checking remotely that
    /// the lease is still ours. A lapsed hold is discarded.
    async fn reenter(&self, key: &HoldKey) -> Result<Option<LockGuard>, LockError> {
        let Some((token, lease)) = self
            .inner
            .holds
            .lock()
            .get(key)
            .map(|h| (h.token.clone(), h.lease))
        else {
            return Ok(None);
        };

        let lease_ms = lease.as_millis().max(1).to_string();
        let owned = self
            .inner
            .store
            .eval_atomic(
                AtomicScript::CompareAndExpire,
                &[&key.name],
                &[token.as_str(), &lease_ms],
            )
            .await
            .map_err(|e| LockError::store(&key.name, e))?
            == 1;

        let mut holds = self.inner.holds.lock();
        let Some(hold) = holds.get_mut(key).filter(|h| h.token == token) else {
            return Ok(None);
        };

        if owned {
            hold.count += 1;
            let state = hold.state.clone();
            debug!(lock = %key.name, count = hold.count, "Lock re-entered");
            drop(holds);
            return Ok(Some(self.guard(key.clone(), token, state)));
        }

        warn!(lock = %key.name, "Held lease expired, acquiring afresh");
        hold.state.mark_lost();
        holds.remove(key);
        Ok(None)
    }

    /// Releases a guard. Equivalent to [`LockGuard::release`].
    pub async fn release(&self, guard: LockGuard) -> Result<ReleaseOutcome, LockError> {
        guard.release().await
    }

    /// Returns true if any holder currently owns `name`.
    pub async fn is_locked(&self, name: &str) -> Result<bool, LockError> {
        let value = self
            .inner
            .store
            .get(name)
            .await
            .map_err(|e| LockError::store(name, e))?;
        Ok(value.is_some())
    }

    fn guard(&self, key: HoldKey, token: LockToken, state: Arc<LeaseState>) -> LockGuard {
        LockGuard {
            inner: self.inner.clone(),
            key,
            token,
            state,
            released: false,
        }
    }
}

impl fmt::Debug for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockManager")
            .field("store", &self.inner.store.name())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Proof of holding a lock.
///
/// Call [`LockGuard::release`] to release and observe the outcome. A guard
/// dropped without release detaches immediately and deletes the lock key in
/// the background.
#[must_use = "dropping the guard releases the lock"]
pub struct LockGuard {
    inner: Arc<Inner>,
    key: HoldKey,
    token: LockToken,
    state: Arc<LeaseState>,
    released: bool,
}

impl LockGuard {
    /// Returns the lock name.
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Returns the holder that owns this guard.
    pub fn holder(&self) -> &HolderId {
        &self.key.holder
    }

    /// Returns the token stored under the lock key.
    pub fn token(&self) -> &LockToken {
        &self.token
    }

    /// Returns how many nested acquisitions are outstanding, this one included.
    pub fn hold_count(&self) -> usize {
        self.inner
            .holds
            .lock()
            .get(&self.key)
            .filter(|h| h.token == self.token)
            .map_or(0, |h| h.count)
    }

    /// Returns the lease renewal state.
    pub fn lease_state(&self) -> &LeaseState {
        &self.state
    }

    /// Releases this acquisition.
    ///
    /// The lock key is deleted only when the outermost acquisition is
    /// released, and only if it still carries this guard's token.
    pub async fn release(mut self) -> Result<ReleaseOutcome, LockError> {
        self.released = true;
        match self.inner.detach(&self.key, &self.token) {
            Some(remaining) if remaining > 0 => Ok(ReleaseOutcome::StillHeld { remaining }),
            _ => self.inner.delete_if_owned(&self.key.name, &self.token).await,
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if matches!(self.inner.detach(&self.key, &self.token), Some(n) if n > 0) {
            return;
        }

        let name = self.key.name.clone();
        match Handle::try_current() {
            Ok(handle) => {
                let inner = self.inner.clone();
                let token = self.token.clone();
                handle.spawn(async move {
                    if let Err(e) = inner.delete_if_owned(&name, &token).await {
                        warn!(lock = %name, error = %e, "Failed to release dropped lock guard");
                    }
                });
            },
            Err(_) => {
                warn!(lock = %name, "No runtime to release dropped lock guard, lease expiry applies");
            },
        }
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("name", &self.key.name)
            .field("holder", &self.key.holder)
            .field("token", &self.token)
            .finish()
    }
}

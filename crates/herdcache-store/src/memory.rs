//! In-memory remote store.
//!
//! Emulates the subset of Redis semantics the workspace relies on: lazy TTL
//! expiry, `SET NX PX`, and the atomic scripts. Every operation runs under a
//! single mutex, which makes the scripts trivially atomic. Time is read from
//! `tokio::time`, so paused-clock tests can drive lease expiry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::script::AtomicScript;
use crate::traits::{RemoteStore, check_arity};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// A process-local store with TTL support.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    available: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates the store going down (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns the number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|e| e.is_live(now)).count()
    }

    /// Returns true if no live keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable("memory store marked unavailable"))
        }
    }

    /// Looks up a live entry, dropping it if it has expired.
    fn live_entry<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut Entry> {
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.ensure_available()?;
        let mut entries = self.entries.lock();
        Ok(Self::live_entry(&mut entries, key, Instant::now()).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.ensure_available()?;
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.ensure_available()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if Self::live_entry(&mut entries, key, now).is_some() {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.ensure_available()?;
        let mut entries = self.entries.lock();
        let existed = Self::live_entry(&mut entries, key, Instant::now()).is_some();
        entries.remove(key);
        Ok(existed)
    }

    async fn eval_atomic(
        &self,
        script: AtomicScript,
        keys: &[&str],
        args: &[&str],
    ) -> Result<i64, StoreError> {
        self.ensure_available()?;
        check_arity(script, keys, args)?;

        let key = keys[0];
        let token = args[0];
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let owned = Self::live_entry(&mut entries, key, now).is_some_and(|e| e.value == token);
        if !owned {
            return Ok(0);
        }

        match script {
            AtomicScript::CompareAndDelete => {
                entries.remove(key);
            },
            AtomicScript::CompareAndExpire => {
                let millis: u64 = args[1]
                    .parse()
                    .map_err(|_| StoreError::script(script.name(), "lease is not an integer"))?;
                if let Some(entry) = entries.get_mut(key) {
                    entry.expires_at = Some(now + Duration::from_millis(millis));
                }
            },
        }

        Ok(1)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        self.ensure_available()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        Ok(Self::live_entry(&mut entries, key, now)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.ensure_available()
    }

    fn name(&self) -> &str {
        "memory"
    }
}

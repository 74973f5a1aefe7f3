//! Read paths behind `get_entities`.
//!
//! Every strategy returns either the full collection or an error, never a
//! partial collection. Store read failures and undecodable payloads are
//! treated as misses; store write failures and lock failures propagate.

use std::sync::Arc;
use std::time::Duration;

use herdcache_core::{CacheError, JsonCodec, PayloadCodec, RecordSource, Result, Student};
use herdcache_lock::{HolderId, LockError, LockManager, LockToken};
use herdcache_store::{AtomicScript, RemoteStore};
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::config::{CacheConfig, PollingConfig};
use super::keys::CacheKey;
use super::local::LocalCache;
use super::strategy::Strategy;
use crate::metrics::CacheMetrics;

/// Resolves queries through the configured caching strategy.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use herdcache_core::StaticSource;
/// use herdcache_lock::{LockConfig, LockManager};
/// use herdcache_server::cache::{CacheConfig, CacheOrchestrator};
/// use herdcache_store::MemoryStore;
///
/// # #[tokio::main]
/// # async fn main() -> herdcache_core::Result<()> {
/// let store = Arc::new(MemoryStore::new());
/// let locks = LockManager::new(store.clone(), LockConfig::default());
/// let cache = CacheOrchestrator::new(
///     store,
///     Arc::new(StaticSource::reference()),
///     locks,
///     CacheConfig::default(),
/// );
///
/// let students = cache.get_entities("all").await?;
/// assert_eq!(students.len(), 3);
/// # Ok(())
/// # }
/// ```
pub struct CacheOrchestrator {
    store: Arc<dyn RemoteStore>,
    source: Arc<dyn RecordSource>,
    codec: Arc<dyn PayloadCodec>,
    locks: LockManager,
    local: LocalCache,
    config: CacheConfig,
    polling: PollingConfig,
    metrics: CacheMetrics,
    /// Process-wide fill mutex of the negative-cache strategy.
    fill_mutex: Mutex<()>,
}

impl CacheOrchestrator {
    /// Creates an orchestrator with the JSON codec and default polling settings.
    pub fn new(
        store: Arc<dyn RemoteStore>,
        source: Arc<dyn RecordSource>,
        locks: LockManager,
        config: CacheConfig,
    ) -> Self {
        let metrics = CacheMetrics::new();
        let local = LocalCache::new(config.local_capacity, config.local_ttl, metrics.clone());

        Self {
            store,
            source,
            codec: Arc::new(JsonCodec),
            locks,
            local,
            config,
            polling: PollingConfig::default(),
            metrics,
            fill_mutex: Mutex::new(()),
        }
    }

    /// Replaces the polling lock settings.
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Replaces the payload codec.
    pub fn with_codec(mut self, codec: Arc<dyn PayloadCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Returns the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the metrics recorder.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Returns the lock manager.
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Returns the store key for `query`.
    pub fn key(&self, query: &str) -> CacheKey {
        CacheKey::new(&self.config.prefix, query)
    }

    /// Resolves `query` with the configured strategy.
    pub async fn get_entities(&self, query: &str) -> Result<Vec<Student>> {
        self.get_with(self.config.strategy, query).await
    }

    /// Resolves `query` with an explicit strategy.
    #[instrument(skip(self), fields(prefix = %self.config.prefix))]
    pub async fn get_with(&self, strategy: Strategy, query: &str) -> Result<Vec<Student>> {
        let start = Instant::now();

        let result = match strategy {
            Strategy::LocalProcess => self.local_process(query).await,
            Strategy::NaiveRemote => self.naive_remote(query).await,
            Strategy::NegativeCache => self.negative_cache(query).await,
            Strategy::PollingLock => self.polling_lock(query).await,
            Strategy::SingleFlight => self.single_flight(query).await,
        };

        self.metrics
            .record_operation_duration(strategy.as_str(), start.elapsed());
        result
    }

    /// In-process cache only.
    pub async fn local_process(&self, query: &str) -> Result<Vec<Student>> {
        let (students, hit) = self
            .local
            .get_or_try_insert_with(query, || self.fetch(query))
            .await?;

        if hit {
            self.metrics.record_hit();
        } else {
            self.metrics.record_miss();
        }
        Ok(students.as_ref().clone())
    }

    /// Remote read-through with no stampede protection.
    ///
    /// Every concurrent miss queries the source, and every entry gets the
    /// same flat TTL.
    pub async fn naive_remote(&self, query: &str) -> Result<Vec<Student>> {
        let key = self.key(query);
        if let Some(students) = self.read_cached(&key).await {
            self.metrics.record_hit();
            return Ok(students);
        }

        self.metrics.record_miss();
        let students = self.fetch(query).await?;
        self.write(&key, &students, self.config.entry_ttl).await?;
        Ok(students)
    }

    /// Remote read-through with negative caching, jittered TTLs and a
    /// process-local mutex with double-check.
    ///
    /// At most one fetch per process at a time; separate processes still
    /// fetch independently.
    pub async fn negative_cache(&self, query: &str) -> Result<Vec<Student>> {
        let key = self.key(query);
        if let Some(students) = self.read_cached(&key).await {
            self.metrics.record_hit();
            return Ok(students);
        }

        let _fill = self.fill_mutex.lock().await;
        self.fill(&key).await
    }

    /// Remote read-through under a fixed-TTL lock, polled at a fixed delay.
    ///
    /// The lock is never renewed, so a fill that outlives `lock_ttl` loses
    /// exclusivity. A caller cancelled while holding the lock releases it
    /// from the guard's drop.
    pub async fn polling_lock(&self, query: &str) -> Result<Vec<Student>> {
        let key = self.key(query);
        let lock_name = key.lock_name(self.config.lock_scope);
        let started = Instant::now();

        for attempt in 1..=self.polling.max_attempts {
            let token = LockToken::mint();
            let acquired = self
                .store
                .set_if_absent(&lock_name, token.as_str(), self.polling.lock_ttl)
                .await?;

            if acquired {
                debug!(lock = %lock_name, attempt, "Polling lock acquired");
                let guard = PollingGuard::new(self.store.clone(), lock_name, token);
                let result = self.fill(&key).await;
                guard.release().await;
                return result;
            }

            if attempt < self.polling.max_attempts {
                tokio::time::sleep(self.polling.retry_delay).await;
            }
        }

        self.metrics.record_lock_timeout();
        warn!(
            lock = %lock_name,
            attempts = self.polling.max_attempts,
            "Gave up polling for lock"
        );
        Err(CacheError::lock_unavailable(lock_name, started.elapsed()))
    }

    /// Remote read-through under the distributed lock manager.
    ///
    /// A hit returns without locking. A miss takes the lock for the key,
    /// re-reads the store, and only then queries the source. The lock is
    /// released on every exit path; if the caller is cancelled the guard's
    /// drop releases it.
    pub async fn single_flight(&self, query: &str) -> Result<Vec<Student>> {
        let key = self.key(query);
        if let Some(students) = self.read_cached(&key).await {
            self.metrics.record_hit();
            return Ok(students);
        }

        let lock_name = key.lock_name(self.config.lock_scope);
        let holder = HolderId::new();
        let guard = self.locks.lock(&lock_name, &holder).await.map_err(|e| {
            if matches!(e, LockError::Timeout { .. }) {
                self.metrics.record_lock_timeout();
            }
            CacheError::from(e)
        })?;

        let result = self.fill(&key).await;

        if let Err(e) = guard.release().await {
            warn!(lock = %lock_name, error = %e, "Failed to release lock");
        }
        result
    }

    /// Drops the cached entry for `query` from the remote store and the
    /// local cache. Returns true if a remote entry existed.
    pub async fn invalidate(&self, query: &str) -> Result<bool> {
        let key = self.key(query);
        self.local.invalidate(query).await;
        let existed = self.store.delete(&key.entry_key()).await?;
        info!(key = %key, existed, "Cache entry invalidated");
        Ok(existed)
    }

    /// Checks the remote store and the record source.
    pub async fn health_check(&self) -> Result<()> {
        if self.config.strategy.uses_remote_store() {
            self.store.health_check().await?;
        }
        self.source.health_check().await?;
        Ok(())
    }

    /// Re-checks the store, and on a miss fetches and populates.
    async fn fill(&self, key: &CacheKey) -> Result<Vec<Student>> {
        if let Some(students) = self.read_cached(key).await {
            self.metrics.record_hit();
            return Ok(students);
        }

        self.metrics.record_miss();
        let students = self.fetch(key.query()).await?;
        self.write(key, &students, self.config.ttl_for(students.len()))
            .await?;
        Ok(students)
    }

    async fn fetch(&self, query: &str) -> Result<Vec<Student>> {
        self.metrics.record_source_fetch();
        self.source.fetch(query).await.map_err(|e| {
            warn!(source = self.source.name(), query, error = %e, "Record source failed");
            CacheError::from(e)
        })
    }

    /// Reads and decodes the entry. Failures of either step are a miss.
    async fn read_cached(&self, key: &CacheKey) -> Option<Vec<Student>> {
        let entry_key = key.entry_key();
        let payload = match self.store.get(&entry_key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %entry_key, error = %e, "Cache read failed, falling back to source");
                return None;
            },
        };

        match self.codec.decode(&payload) {
            Ok(students) => {
                debug!(key = %entry_key, count = students.len(), "Cache hit");
                Some(students)
            },
            Err(e) => {
                self.metrics.record_malformed();
                warn!(key = %entry_key, error = %e, "Discarding malformed cache payload");
                None
            },
        }
    }

    async fn write(&self, key: &CacheKey, students: &[Student], ttl: Duration) -> Result<()> {
        let payload = self.codec.encode(students)?;
        let entry_key = key.entry_key();
        self.store.set(&entry_key, &payload, Some(ttl)).await?;

        info!(
            key = %entry_key,
            count = students.len(),
            ttl_ms = ttl.as_millis() as u64,
            "Cache populated"
        );
        Ok(())
    }
}

/// Holds a polling lock until released or dropped.
struct PollingGuard {
    store: Arc<dyn RemoteStore>,
    lock_name: String,
    token: LockToken,
    released: bool,
}

impl PollingGuard {
    fn new(store: Arc<dyn RemoteStore>, lock_name: String, token: LockToken) -> Self {
        Self {
            store,
            lock_name,
            token,
            released: false,
        }
    }

    async fn release(mut self) {
        self.released = true;
        release_polling_lock(self.store.as_ref(), &self.lock_name, &self.token).await;
    }
}

impl Drop for PollingGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                let store = self.store.clone();
                let lock_name = std::mem::take(&mut self.lock_name);
                let token = self.token.clone();
                handle.spawn(async move {
                    release_polling_lock(store.as_ref(), &lock_name, &token).await;
                });
            },
            Err(_) => {
                warn!(
                    lock = %self.lock_name,
                    "No runtime to release dropped polling lock, lock_ttl applies"
                );
            },
        }
    }
}

async fn release_polling_lock(store: &dyn RemoteStore, lock_name: &str, token: &LockToken) {
    let result = store
        .eval_atomic(AtomicScript::CompareAndDelete, &[lock_name], &[token.as_str()])
        .await;

    match result {
        Ok(1) => debug!(lock = lock_name, "Polling lock released"),
        Ok(_) => warn!(lock = lock_name, "Polling lock expired before release"),
        Err(e) => warn!(lock = lock_name, error = %e, "Failed to release polling lock"),
    }
}

//! Process-local cache using Moka.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use herdcache_core::{CacheError, Student};
use moka::future::Cache;

use crate::metrics::CacheMetrics;

/// Cache en memoria del proceso, por query.
///
/// Only correct for a single process: every replica keeps its own copy and
/// fetches on its own misses. Concurrent misses for one key inside the
/// process are coalesced into a single `init` call.
#[derive(Clone)]
pub struct LocalCache {
    inner: Cache<String, Arc<Vec<Student>>>,
}

impl LocalCache {
    /// Crea un nuevo cache local.
    pub fn new(max_capacity: u64, ttl: Duration, metrics: CacheMetrics) -> Self {
        let eviction_metrics = metrics;
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .eviction_listener(move |_key, _value, cause| {
                let reason = match cause {
                    moka::notification::RemovalCause::Expired => "ttl",
                    moka::notification::RemovalCause::Size => "capacity",
                    moka::notification::RemovalCause::Explicit => "manual",
                    moka::notification::RemovalCause::Replaced => "replaced",
                };
                eviction_metrics.record_eviction(reason);
            })
            .build();

        Self { inner }
    }

    /// Obtiene la coleccion si existe.
    pub async fn get(&self, query: &str) -> Option<Arc<Vec<Student>>> {
        self.inner.get(query).await
    }

    /// Returns the cached collection, or runs `init` once to fill it.
    ///
    /// Returns the collection and whether it was served from the cache.
    pub async fn get_or_try_insert_with<F, Fut>(
        &self,
        query: &str,
        init: F,
    ) -> Result<(Arc<Vec<Student>>, bool), CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Student>, CacheError>>,
    {
        if let Some(cached) = self.inner.get(query).await {
            return Ok((cached, true));
        }

        let value = self
            .inner
            .try_get_with(query.to_string(), async { init().await.map(Arc::new) })
            .await
            .map_err(|e: Arc<CacheError>| (*e).clone())?;

        Ok((value, false))
    }

    /// Invalida una entrada.
    pub async fn invalidate(&self, query: &str) {
        self.inner.invalidate(query).await;
    }

    /// Retorna el numero aproximado de entries.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Fuerza la limpieza de entries pendientes (para tests).
    #[cfg(test)]
    pub(crate) async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}

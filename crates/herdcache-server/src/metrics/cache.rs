//! Cache metrics recording.

use metrics::{counter, histogram};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Registra las metricas de cache.
/// Llamar una vez al inicio para registrar las metricas.
pub fn register_cache_metrics() {
    metrics::describe_counter!(
        "herdcache_cache_hits_total",
        "Total number of reads served from a cache"
    );
    metrics::describe_counter!(
        "herdcache_cache_misses_total",
        "Total number of reads served from the record source"
    );
    metrics::describe_counter!(
        "herdcache_source_fetches_total",
        "Total number of record source fetches"
    );
    metrics::describe_counter!(
        "herdcache_malformed_payloads_total",
        "Cached payloads discarded because they could not be decoded"
    );
    metrics::describe_counter!(
        "herdcache_lock_timeouts_total",
        "Lock acquisitions that gave up waiting"
    );
    metrics::describe_counter!(
        "herdcache_local_evictions_total",
        "Evictions from the process-local cache"
    );
    metrics::describe_histogram!(
        "herdcache_operation_seconds",
        "Time spent resolving a query"
    );
}

/// Recorder de metricas de cache.
/// Usa atomic counters internos para que los tests y el hit rate no dependan
/// del recorder global.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    source_fetches: Arc<AtomicU64>,
    malformed: Arc<AtomicU64>,
    lock_timeouts: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un read servido desde cache
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!("herdcache_cache_hits_total").increment(1);
    }

    /// Registra un read servido desde la fuente
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("herdcache_cache_misses_total").increment(1);
    }

    /// Registra una llamada a la fuente, exitosa o no
    pub fn record_source_fetch(&self) {
        self.source_fetches.fetch_add(1, Ordering::Relaxed);
        counter!("herdcache_source_fetches_total").increment(1);
    }

    /// Registra un payload descartado
    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
        counter!("herdcache_malformed_payloads_total").increment(1);
    }

    /// Registra un timeout de lock
    pub fn record_lock_timeout(&self) {
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
        counter!("herdcache_lock_timeouts_total").increment(1);
    }

    /// Registra una eviction del cache local
    pub fn record_eviction(&self, reason: &str) {
        counter!("herdcache_local_evictions_total", "reason" => reason.to_string()).increment(1);
    }

    /// Registra la duracion de una operacion
    pub fn record_operation_duration(&self, strategy: &str, duration: Duration) {
        histogram!(
            "herdcache_operation_seconds",
            "strategy" => strategy.to_string()
        )
        .record(duration.as_secs_f64());
    }

    /// Calcula hit rate (para logging/debugging)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let misses = self.misses() as f64;
        let total = hits + misses;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    /// Retorna el numero de hits
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Retorna el numero de misses
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Retorna el numero de fetches a la fuente
    pub fn source_fetches(&self) -> u64 {
        self.source_fetches.load(Ordering::Relaxed)
    }

    /// Retorna el numero de payloads descartados
    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    /// Retorna el numero de timeouts de lock
    pub fn lock_timeouts(&self) -> u64 {
        self.lock_timeouts.load(Ordering::Relaxed)
    }
}

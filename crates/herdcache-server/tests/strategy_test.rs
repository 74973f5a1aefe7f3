//! Comportamiento de cada estrategia bajo concurrencia.
//!
//! Each orchestrator stands in for one process: it has its own lock manager,
//! local cache and fill mutex, and shares only the store and the source.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{orchestrator, orchestrator_with, reference_students, slow_source};
use herdcache_core::{StaticSource, Student};
use herdcache_server::{CacheConfig, CacheOrchestrator, LockScope, Strategy};
use herdcache_store::{MemoryStore, RemoteStore};
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

const CALLERS: usize = 10;

/// Spawns `CALLERS` concurrent lookups spread round-robin over `caches`.
async fn stampede(
    caches: &[Arc<CacheOrchestrator>],
    query: &'static str,
) -> Vec<herdcache_core::Result<Vec<Student>>> {
    let handles: Vec<_> = (0..CALLERS)
        .map(|i| {
            let cache = caches[i % caches.len()].clone();
            tokio::spawn(async move { cache.get_entities(query).await })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.expect("task panicked"));
    }
    results
}

fn processes(
    store: &Arc<MemoryStore>,
    source: &Arc<StaticSource>,
    strategy: Strategy,
    count: usize,
) -> Vec<Arc<CacheOrchestrator>> {
    (0..count)
        .map(|_| Arc::new(orchestrator(store, source, strategy)))
        .collect()
}

fn assert_all_reference(results: Vec<herdcache_core::Result<Vec<Student>>>) {
    for result in results {
        assert_eq!(assert_ok!(result), reference_students());
    }
}

// === Single flight ===

#[tokio::test(start_paused = true)]
async fn single_flight_warm_cache_does_not_refetch() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let cache = orchestrator(&store, &source, Strategy::SingleFlight);

    for _ in 0..5 {
        assert_ok!(cache.get_entities("all").await);
    }

    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn single_flight_cold_stampede_fetches_once_across_processes() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let caches = processes(&store, &source, Strategy::SingleFlight, 3);

    let results = stampede(&caches, "all").await;

    assert_all_reference(results);
    assert_eq!(source.fetch_count(), 1);
    assert!(store.get("students:lock:all").await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn single_flight_serves_cached_empty_result() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    store.set("students:data:all", "[]", None).await.unwrap();
    let cache = orchestrator(&store, &source, Strategy::SingleFlight);

    let students = assert_ok!(cache.get_entities("all").await);

    assert!(students.is_empty());
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn single_flight_empty_result_uses_negative_ttl() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let cache = orchestrator(&store, &source, Strategy::SingleFlight);

    assert_ok!(cache.get_entities("nobody").await);

    let ttl = store.ttl("students:data:nobody").await.unwrap().unwrap();
    assert!(ttl <= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn single_flight_positive_ttl_is_jittered_within_bounds() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let cache = orchestrator(&store, &source, Strategy::SingleFlight);

    assert_ok!(cache.get_entities("all").await);

    let ttl = store.ttl("students:data:all").await.unwrap().unwrap();
    assert!(ttl > Duration::from_secs(290), "ttl too short: {:?}", ttl);
    assert!(ttl <= Duration::from_secs(360), "ttl too long: {:?}", ttl);
}

#[tokio::test(start_paused = true)]
async fn single_flight_global_scope_serializes_distinct_queries() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(
        StaticSource::reference()
            .with_records("men", reference_students())
            .with_latency(helpers::SOURCE_LATENCY),
    );
    let config = CacheConfig::default()
        .with_strategy(Strategy::SingleFlight)
        .with_lock_scope(LockScope::Global);
    let a = Arc::new(orchestrator_with(&store, &source, config.clone()));
    let b = Arc::new(orchestrator_with(&store, &source, config));

    let started = Instant::now();
    let (ra, rb) = tokio::join!(a.get_entities("all"), b.get_entities("men"));

    assert_eq!(assert_ok!(ra), reference_students());
    assert_eq!(assert_ok!(rb), reference_students());
    // both fills ran under the same lock, one after the other
    assert!(started.elapsed() >= helpers::SOURCE_LATENCY * 2);
    assert!(store.get("students:lock").await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn single_flight_cancelled_caller_leaves_no_lock() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let cache = Arc::new(orchestrator(&store, &source, Strategy::SingleFlight));

    let task = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get_entities("all").await })
    };

    // Cancel mid-fetch, while the lock is held
    tokio::time::sleep(helpers::SOURCE_LATENCY / 2).await;
    assert!(store.get("students:lock:all").await.unwrap().is_some());
    task.abort();
    assert!(assert_err!(task.await).is_cancelled());

    // let the guard's drop-time release run
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(store.get("students:lock:all").await.unwrap().is_none());

    let other = orchestrator(&store, &source, Strategy::SingleFlight);
    let started = Instant::now();
    assert_eq!(assert_ok!(other.get_entities("all").await), reference_students());
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn single_flight_source_failure_is_not_cached() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let cache = orchestrator(&store, &source, Strategy::SingleFlight);

    source.set_failing(true);
    let err = assert_err!(cache.get_entities("all").await);
    assert!(err.is_source_unavailable());
    assert!(store.is_empty());

    source.set_failing(false);
    assert_eq!(assert_ok!(cache.get_entities("all").await), reference_students());
}

// === Naive remote ===

#[tokio::test(start_paused = true)]
async fn naive_remote_cold_stampede_fetches_per_caller() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let caches = processes(&store, &source, Strategy::NaiveRemote, 1);

    let results = stampede(&caches, "all").await;

    assert_all_reference(results);
    assert_eq!(source.fetch_count(), CALLERS as u64);
}

#[tokio::test(start_paused = true)]
async fn naive_remote_caches_empty_with_flat_ttl() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let cache = orchestrator(&store, &source, Strategy::NaiveRemote);

    assert_ok!(cache.get_entities("nobody").await);

    let ttl = store.ttl("students:data:nobody").await.unwrap().unwrap();
    assert!(ttl > Duration::from_secs(290));
    assert!(ttl <= Duration::from_secs(300));
}

// === Negative cache ===

#[tokio::test(start_paused = true)]
async fn negative_cache_fetches_once_per_process() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let caches = processes(&store, &source, Strategy::NegativeCache, 1);

    let results = stampede(&caches, "all").await;

    assert_all_reference(results);
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn negative_cache_does_not_coordinate_processes() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let caches = processes(&store, &source, Strategy::NegativeCache, 3);

    let results = stampede(&caches, "all").await;

    assert_all_reference(results);
    let fetches = source.fetch_count();
    assert!(fetches > 1, "expected independent fills, got {}", fetches);
    assert!(fetches <= 3);
}

// === Polling lock ===

#[tokio::test(start_paused = true)]
async fn polling_lock_cold_stampede_fetches_once() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let caches = processes(&store, &source, Strategy::PollingLock, 3);

    let results = stampede(&caches, "all").await;

    assert_all_reference(results);
    assert_eq!(source.fetch_count(), 1);
    assert!(store.get("students:lock:all").await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn polling_lock_cancelled_caller_leaves_no_lock() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let cache = Arc::new(orchestrator(&store, &source, Strategy::PollingLock));

    let task = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get_entities("all").await })
    };

    tokio::time::sleep(helpers::SOURCE_LATENCY / 2).await;
    assert!(store.get("students:lock:all").await.unwrap().is_some());
    task.abort();
    assert!(assert_err!(task.await).is_cancelled());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(store.get("students:lock:all").await.unwrap().is_none());

    let other = orchestrator(&store, &source, Strategy::PollingLock);
    let started = Instant::now();
    assert_eq!(assert_ok!(other.get_entities("all").await), reference_students());
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn polling_lock_gives_up_after_max_attempts() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    store
        .set_if_absent("students:lock:all", "stuck", Duration::from_secs(600))
        .await
        .unwrap();
    let cache = orchestrator(&store, &source, Strategy::PollingLock);

    let started = Instant::now();
    let err = assert_err!(cache.get_entities("all").await);

    assert!(err.is_lock_unavailable());
    // five attempts, four waits of 300ms in between
    assert!(started.elapsed() >= Duration::from_millis(1200));
    assert_eq!(source.fetch_count(), 0);
    assert_eq!(cache.metrics().lock_timeouts(), 1);
}

#[tokio::test(start_paused = true)]
async fn polling_lock_does_not_delete_foreign_lock() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let cache = orchestrator(&store, &source, Strategy::PollingLock);

    let task = {
        let store = store.clone();
        tokio::spawn(async move {
            // Steal the lock while the owner is fetching
            tokio::time::sleep(helpers::SOURCE_LATENCY / 2).await;
            store.delete("students:lock:all").await.unwrap();
            store
                .set_if_absent("students:lock:all", "thief", Duration::from_secs(60))
                .await
                .unwrap()
        })
    };

    assert_ok!(cache.get_entities("all").await);
    assert!(assert_ok!(task.await));
    assert_eq!(
        store.get("students:lock:all").await.unwrap().as_deref(),
        Some("thief")
    );
}

// === Local process ===

#[tokio::test(start_paused = true)]
async fn local_process_coalesces_and_skips_store() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let caches = processes(&store, &source, Strategy::LocalProcess, 1);

    let results = stampede(&caches, "all").await;

    assert_all_reference(results);
    assert_eq!(source.fetch_count(), 1);
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn local_process_each_process_fills_its_own_cache() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    let caches = processes(&store, &source, Strategy::LocalProcess, 2);

    let results = stampede(&caches, "all").await;

    assert_all_reference(results);
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn local_process_ignores_store_outage() {
    let store = Arc::new(MemoryStore::new());
    let source = slow_source();
    store.set_available(false);
    let cache = orchestrator(&store, &source, Strategy::LocalProcess);

    assert_eq!(assert_ok!(cache.get_entities("all").await), reference_students());
}

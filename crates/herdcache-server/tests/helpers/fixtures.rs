//! Shared fixtures: stores, sources and wired-up apps.

use std::sync::Arc;
use std::time::Duration;

use herdcache_core::{Sex, StaticSource, Student};
use herdcache_lock::{LockConfig, LockManager};
use herdcache_server::metrics::setup::detached_handle;
use herdcache_server::{
    AppState, CacheConfig, CacheOrchestrator, PollingConfig, Strategy, create_router,
};
use herdcache_store::MemoryStore;

use super::client::TestClient;

/// Latencia simulada de la fuente, suficiente para que las llamadas se solapen.
pub const SOURCE_LATENCY: Duration = Duration::from_millis(100);

/// Lock settings tuned for paused-clock tests.
pub fn lock_config() -> LockConfig {
    LockConfig::builder()
        .lease(Duration::from_secs(3))
        .acquire_timeout(Duration::from_secs(10))
        .backoff(Duration::from_millis(10), Duration::from_millis(100))
        .build()
        .unwrap()
}

/// The reference collection for `all`.
pub fn reference_students() -> Vec<Student> {
    vec![
        Student::new("zhangsan1", 23, Sex::Man),
        Student::new("zhangsan2", 24, Sex::Man),
        Student::new("zhangsan3", 25, Sex::Man),
    ]
}

/// A slow reference source.
pub fn slow_source() -> Arc<StaticSource> {
    Arc::new(StaticSource::reference().with_latency(SOURCE_LATENCY))
}

/// One "process": an orchestrator with its own lock manager and local cache.
pub fn orchestrator(
    store: &Arc<MemoryStore>,
    source: &Arc<StaticSource>,
    strategy: Strategy,
) -> CacheOrchestrator {
    orchestrator_with(store, source, CacheConfig::default().with_strategy(strategy))
}

/// Like [`orchestrator`] with explicit cache settings.
pub fn orchestrator_with(
    store: &Arc<MemoryStore>,
    source: &Arc<StaticSource>,
    config: CacheConfig,
) -> CacheOrchestrator {
    let locks = LockManager::new(store.clone(), lock_config());
    CacheOrchestrator::new(store.clone(), source.clone(), locks, config).with_polling(
        PollingConfig {
            lock_ttl: Duration::from_secs(300),
            retry_delay: Duration::from_millis(300),
            max_attempts: 5,
        },
    )
}

/// Full HTTP app over an in-memory store.
pub struct TestApp {
    pub client: TestClient,
    pub store: Arc<MemoryStore>,
    pub source: Arc<StaticSource>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_source(Arc::new(StaticSource::reference()))
    }

    pub fn with_source(source: Arc<StaticSource>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = orchestrator(&store, &source, Strategy::SingleFlight);
        let router = create_router(AppState::new(Arc::new(cache)), detached_handle());

        Self {
            client: TestClient::new(router),
            store,
            source,
        }
    }
}

/// Verifica que una respuesta JSON sea una lista de students bien formada.
pub fn assert_student_list(json: &serde_json::Value) {
    let list = json.as_array().expect("Response should be a JSON array");
    for student in list {
        let obj = student.as_object().expect("Student should be an object");
        assert!(obj["name"].is_string(), "'name' should be a string");
        assert!(obj["age"].is_u64(), "'age' should be a non-negative integer");
        assert!(
            matches!(obj["sex"].as_str(), Some("man" | "woman")),
            "'sex' should be man or woman"
        );
    }
}

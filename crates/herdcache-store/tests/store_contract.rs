//! Behaviour every `RemoteStore` backend must share.
//!
//! The Redis variant needs a running server and is ignored by default:
//! `REDIS_URL=redis://127.0.0.1:6379 cargo test -p herdcache-store -- --ignored`

use std::time::Duration;

use herdcache_store::{AtomicScript, MemoryStore, RedisStore, RemoteStore};

async fn exercise_contract(store: &dyn RemoteStore, prefix: &str) {
    let key = format!("{prefix}:entry");
    let lock = format!("{prefix}:lock");
    let _ = store.delete(&key).await;
    let _ = store.delete(&lock).await;

    // Plain values
    assert!(store.get(&key).await.unwrap().is_none());
    store
        .set(&key, "[]", Some(Duration::from_secs(60)))
        .await
        .unwrap();
    assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("[]"));
    let ttl = store.ttl(&key).await.unwrap().expect("entry should expire");
    assert!(ttl <= Duration::from_secs(60));

    // Conditional set
    let lease = Duration::from_secs(30);
    assert!(store.set_if_absent(&lock, "token-a", lease).await.unwrap());
    assert!(!store.set_if_absent(&lock, "token-b", lease).await.unwrap());

    // Owner-checked scripts
    let foreign = store
        .eval_atomic(AtomicScript::CompareAndExpire, &[&lock], &["token-b", "60000"])
        .await
        .unwrap();
    assert_eq!(foreign, 0);

    let renewed = store
        .eval_atomic(AtomicScript::CompareAndExpire, &[&lock], &["token-a", "60000"])
        .await
        .unwrap();
    assert_eq!(renewed, 1);
    assert!(store.ttl(&lock).await.unwrap().unwrap() > lease);

    let foreign = store
        .eval_atomic(AtomicScript::CompareAndDelete, &[&lock], &["token-b"])
        .await
        .unwrap();
    assert_eq!(foreign, 0);
    assert_eq!(store.get(&lock).await.unwrap().as_deref(), Some("token-a"));

    let released = store
        .eval_atomic(AtomicScript::CompareAndDelete, &[&lock], &["token-a"])
        .await
        .unwrap();
    assert_eq!(released, 1);
    assert!(store.get(&lock).await.unwrap().is_none());

    // Delete
    assert!(store.delete(&key).await.unwrap());
    assert!(!store.delete(&key).await.unwrap());

    // Arity is checked before anything reaches the backend
    assert!(
        store
            .eval_atomic(AtomicScript::CompareAndDelete, &[&lock], &[])
            .await
            .is_err()
    );

    assert!(store.health_check().await.is_ok());
}

#[tokio::test]
async fn memory_store_honours_contract() {
    let store = MemoryStore::new();
    exercise_contract(&store, "herdcache-test").await;
    assert_eq!(store.name(), "memory");
}

#[tokio::test]
#[ignore = "requires a running Redis server (set REDIS_URL)"]
async fn redis_store_honours_contract() {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let store = RedisStore::connect(&url).await.unwrap();
    exercise_contract(&store, &format!("herdcache-test-{}", std::process::id())).await;
}

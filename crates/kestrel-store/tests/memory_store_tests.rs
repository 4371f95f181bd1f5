//! Behaviour of the in-memory backend under concurrent callers.

use std::sync::Arc;
use std::time::Duration;

use kestrel_core::ManualClock;
use kestrel_store::{KeyValueStore, MemoryStore, SharedStore};

fn shared_store() -> (SharedStore, ManualClock) {
    let clock = ManualClock::at_millis(1_700_000_000_000);
    let store = MemoryStore::with_clock(10_000, Arc::new(clock.clone()));
    (Arc::new(store), clock)
}

#[tokio::test]
async fn concurrent_increments_are_not_lost() {
    let (store, _) = shared_store();

    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.increment("rate_limit:ip:1:0").await.unwrap() })
        })
        .collect();

    let mut seen = Vec::new();
    for task in tasks {
        seen.push(task.await.unwrap());
    }
    seen.sort_unstable();

    // Every caller observes a distinct count
    assert_eq!(seen, (1..=50).collect::<Vec<i64>>());
    assert_eq!(
        store.get("rate_limit:ip:1:0").await.unwrap().as_deref(),
        Some("50")
    );
}

#[tokio::test]
async fn set_replaces_value_and_ttl() {
    let (store, clock) = shared_store();

    store
        .set("stats", "old", Some(Duration::from_secs(1)))
        .await
        .unwrap();
    store.set("stats", "new", None).await.unwrap();

    clock.advance(Duration::from_secs(10));
    assert_eq!(store.get("stats").await.unwrap().as_deref(), Some("new"));
}

#[tokio::test]
async fn expire_refreshes_hash_lifetime() {
    let (store, clock) = shared_store();

    store.hash_set("session:7", "data", "{}").await.unwrap();
    assert!(store
        .expire("session:7", Duration::from_secs(60))
        .await
        .unwrap());

    clock.advance(Duration::from_secs(45));
    store.hash_set("session:7", "data", "{\"n\":1}").await.unwrap();
    assert!(store
        .expire("session:7", Duration::from_secs(60))
        .await
        .unwrap());

    clock.advance(Duration::from_secs(45));
    assert_eq!(
        store.hash_get("session:7", "data").await.unwrap().as_deref(),
        Some("{\"n\":1}")
    );

    clock.advance(Duration::from_secs(16));
    assert!(store.hash_get("session:7", "data").await.unwrap().is_none());
}

#[tokio::test]
async fn expired_keys_are_hidden_from_listing() {
    let (store, clock) = shared_store();

    store
        .set("user:1:todos", "[]", Some(Duration::from_secs(5)))
        .await
        .unwrap();
    store.set("user:1:profile", "{}", None).await.unwrap();

    clock.advance(Duration::from_secs(6));
    assert_eq!(
        store.keys_matching("user:1:*").await.unwrap(),
        vec!["user:1:profile".to_string()]
    );
    assert_eq!(store.db_size().await.unwrap(), 1);
}

#[tokio::test]
async fn delete_many_counts_existing_keys() {
    let (store, _) = shared_store();
    store.set("a", "1", None).await.unwrap();
    store.set("b", "2", None).await.unwrap();

    let removed = store
        .delete_many(&["a".into(), "b".into(), "missing".into()])
        .await
        .unwrap();
    assert_eq!(removed, 2);
}

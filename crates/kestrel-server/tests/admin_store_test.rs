//! Operational endpoints under /admin/store.

mod helpers;

use std::time::Duration;

use axum::http::StatusCode;
use helpers::test_app;
use kestrel_core::UserId;
use kestrel_store::KeyValueStore;
use serde_json::Value;

async fn seed(app: &helpers::TestApp) {
    for key in [
        "user:1:todos",
        "user:1:profile",
        "user:2:todos",
        "admin:all-users",
        "admin:all-todos",
        "admin:system-stats",
    ] {
        app.store.set(key, "[]", None).await.unwrap();
    }
}

#[tokio::test]
async fn info_reports_backend_and_size() {
    let app = test_app();
    seed(&app).await;

    let response = app.client.get("/admin/store/info").await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["backend"], "memory");
    // Seeded keys plus the admin rate-limit counter of this request
    assert_eq!(body["dbSize"], 7);
    assert!(body["info"]["keyspace"].is_object());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn keys_listing_filters_by_pattern() {
    let app = test_app();
    seed(&app).await;

    let response = app.client.get("/admin/store/keys/user:1:*").await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["pattern"], "user:1:*");
    assert_eq!(body["count"], 2);
    assert_eq!(
        body["keys"],
        serde_json::json!(["user:1:profile", "user:1:todos"])
    );
}

#[tokio::test]
async fn keys_listing_rejects_broken_glob() {
    let app = test_app();

    let response = app.client.get("/admin/store/keys/user%3A%5B").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn clear_user_only_touches_that_user() {
    let app = test_app();
    seed(&app).await;

    let response = app.client.delete("/admin/store/cache/user/1").await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["invalidated"], 2);

    assert!(!app.store.exists("user:1:todos").await.unwrap());
    assert!(app.store.exists("user:2:todos").await.unwrap());
}

#[tokio::test]
async fn clear_namespaces() {
    let app = test_app();
    seed(&app).await;

    for (path, key) in [
        ("/admin/store/cache/users", "admin:all-users"),
        ("/admin/store/cache/todos", "admin:all-todos"),
        ("/admin/store/cache/stats", "admin:system-stats"),
    ] {
        let response = app.client.delete(path).await;
        response.assert_status(StatusCode::OK);
        assert!(!app.store.exists(key).await.unwrap(), "{} survived", key);
    }
    assert!(app.store.exists("user:1:todos").await.unwrap());
}

#[tokio::test]
async fn unknown_namespace_is_rejected() {
    let app = test_app();

    let response = app.client.delete("/admin/store/cache/sessions").await;
    assert!(response.status.is_client_error());
}

#[tokio::test]
async fn clear_all_flushes_store() {
    let app = test_app();
    seed(&app).await;
    app.state
        .cache()
        .set_user_session(UserId::new(1), &"session")
        .await;

    let response = app.client.delete("/admin/store/cache/all").await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["message"], "All cache cleared");

    // The guard's own counter is flushed with everything else
    assert_eq!(app.store.db_size().await.unwrap(), 0);
}

#[tokio::test]
async fn warm_is_acknowledged() {
    let app = test_app();

    let response = app.client.post("/admin/store/cache/warm").await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["message"], "Cache warming initiated");
}

#[tokio::test]
async fn store_outage_surfaces_as_503() {
    let app = test_app();
    app.store.simulate_outage(true);

    app.client
        .get("/admin/store/info")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    app.client
        .delete("/admin/store/cache/all")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn expired_keys_are_not_listed() {
    let app = test_app();
    app.store
        .set("user:3:todos", "[]", Some(Duration::from_secs(5)))
        .await
        .unwrap();

    app.clock.advance(Duration::from_secs(6));

    let body: Value = app.client.get("/admin/store/keys/user:*").await.json();
    assert_eq!(body["count"], 0);
}

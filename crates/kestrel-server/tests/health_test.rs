mod helpers;

use axum::http::StatusCode;
use helpers::test_app;
use serde_json::Value;

#[tokio::test]
async fn health_check_returns_200_when_stores_answer() {
    let app = test_app();

    let response = app.client.get("/health").await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["database"]["status"], "healthy");
    assert_eq!(body["services"]["store"]["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn health_check_returns_503_on_store_outage() {
    let app = test_app();
    app.store.simulate_outage(true);

    let response = app.client.get("/health").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = response.json();
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["services"]["store"]["status"], "unhealthy");
    assert_eq!(body["services"]["database"]["status"], "healthy");
}

#[tokio::test]
async fn health_check_leaves_no_sentinel_behind() {
    let app = test_app();
    app.client.get("/health").await;

    let keys = app.state.operations().keys("*").await.unwrap();
    assert_eq!(keys.count, 0);
}

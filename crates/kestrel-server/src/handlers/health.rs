use axum::{Json, extract::State, http::StatusCode};

use crate::health::HealthReport;
use crate::state::AppState;

/// GET /health
///
/// 200 when every dependency answers, 503 otherwise; the body is the same
/// report in both cases.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.health().check().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

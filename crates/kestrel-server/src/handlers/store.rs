//! Operational endpoints over the shared store (`/admin/store/*`).

use axum::{
    extract::{Path, State},
    response::Json,
};
use kestrel_core::UserId;
use serde::Serialize;
use tracing::instrument;

use crate::error::AppError;
use crate::operational::{CacheNamespace, KeyListing, StoreOverview};
use crate::state::AppState;

/// Response de las operaciones de mantenimiento.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    /// Número de entries eliminadas, cuando se conoce.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidated: Option<u64>,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            invalidated: None,
        }
    }

    fn with_count(message: impl Into<String>, count: u64) -> Self {
        Self {
            message: message.into(),
            invalidated: Some(count),
        }
    }
}

/// GET /admin/store/info
#[instrument(skip_all)]
pub async fn store_info(State(state): State<AppState>) -> Result<Json<StoreOverview>, AppError> {
    Ok(Json(state.operations().info().await?))
}

/// GET /admin/store/keys/{pattern}
#[instrument(skip_all, fields(pattern = %pattern))]
pub async fn list_keys(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
) -> Result<Json<KeyListing>, AppError> {
    Ok(Json(state.operations().keys(&pattern).await?))
}

/// DELETE /admin/store/cache/all
#[instrument(skip_all)]
pub async fn clear_all(State(state): State<AppState>) -> Result<Json<MessageResponse>, AppError> {
    state.operations().clear_all().await?;
    tracing::info!("Store flushed by operator");
    Ok(Json(MessageResponse::new("All cache cleared")))
}

/// DELETE /admin/store/cache/user/{id}
#[instrument(skip_all, fields(user = %user))]
pub async fn clear_user(
    State(state): State<AppState>,
    Path(user): Path<UserId>,
) -> Result<Json<MessageResponse>, AppError> {
    let result = state.operations().clear_user(user).await?;
    Ok(Json(MessageResponse::with_count(
        format!("Cache cleared for user {}", user),
        result.count,
    )))
}

/// DELETE /admin/store/cache/{namespace}
/// Namespaces: `users`, `todos`, `stats`.
#[instrument(skip_all, fields(namespace = namespace.as_str()))]
pub async fn clear_namespace(
    State(state): State<AppState>,
    Path(namespace): Path<CacheNamespace>,
) -> Result<Json<MessageResponse>, AppError> {
    let removed = state.operations().clear_namespace(namespace).await?;
    Ok(Json(MessageResponse::with_count(
        format!("{} cache cleared", namespace.as_str()),
        removed,
    )))
}

/// POST /admin/store/cache/warm
#[instrument(skip_all)]
pub async fn warm_cache(State(state): State<AppState>) -> Json<MessageResponse> {
    Json(MessageResponse::new(state.operations().warm()))
}

/// DELETE /admin/store/rate-limit/{client}
/// `client` is a client key such as `user:7` or `ip:10.0.0.1`.
#[instrument(skip_all, fields(client = %client))]
pub async fn reset_rate_limit(
    State(state): State<AppState>,
    Path(client): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let removed = state.limiter().reset(&client).await?;
    Ok(Json(MessageResponse::with_count(
        format!("Rate limit reset for {}", client),
        removed,
    )))
}

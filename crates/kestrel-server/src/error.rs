//! HTTP error mapping.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use kestrel_core::KestrelError;
use kestrel_store::StoreError;
use serde::Serialize;

/// Errors returned by HTTP handlers and the rate-limit guard.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Registro no encontrado
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    /// Parametros invalidos
    #[error("{0}")]
    BadRequest(String),

    /// Client exhausted its window budget.
    #[error("too many requests, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// A backing service could not be reached.
    #[error("{0}")]
    Unavailable(String),

    /// Error interno
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

/// Body of a 429 response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitedResponse {
    status_code: u16,
    message: &'static str,
    error: &'static str,
    retry_after: u64,
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let Self::RateLimited { retry_after_secs } = self {
            let body = Json(RateLimitedResponse {
                status_code: status.as_u16(),
                message: "Too many requests",
                error: "Too Many Requests",
                retry_after: retry_after_secs,
            });
            let mut response = (status, body).into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            return response;
        }

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<KestrelError> for AppError {
    fn from(err: KestrelError) -> Self {
        match err {
            KestrelError::NotFound { .. } => Self::NotFound(err.to_string()),
            KestrelError::Conflict(message) => Self::Conflict(message),
            KestrelError::Forbidden(message) => Self::Forbidden(message),
            KestrelError::Validation { .. } => Self::BadRequest(err.to_string()),
            KestrelError::Unavailable(message) => Self::Unavailable(message),
            KestrelError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidPattern { .. } => Self::BadRequest(err.to_string()),
            StoreError::Unavailable { .. } | StoreError::Timeout { .. } => {
                Self::Unavailable(err.to_string())
            }
            _ => Self::Internal(err.to_string()),
        }
    }
}

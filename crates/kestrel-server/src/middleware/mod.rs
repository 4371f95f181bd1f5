//! Middleware stack para el servidor HTTP.
//!
//! - `RequestIdLayer`: genera/propaga X-Request-Id
//! - `LoggingLayer`: logging estructurado de requests
//! - `rate_limit`: guard de rate limiting por clase de endpoint

mod logging;
pub mod rate_limit;
mod request_id;

pub use logging::{LoggingLayer, LoggingMiddleware};
pub use rate_limit::{RateLimitGuard, rate_limit_guard};
pub use request_id::{REQUEST_ID_HEADER, RequestId, RequestIdLayer, RequestIdMiddleware};

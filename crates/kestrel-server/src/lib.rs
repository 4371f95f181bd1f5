//! Kestrel Server - rate limiting, caching and store operations
//!
//! This crate wires the shared key-value store into:
//!
//! - [`rate_limit`]: distributed fixed-window rate limiter and its HTTP guard
//! - [`cache`]: read-through cache with write invalidation
//! - [`session`]: per-user sessions with sliding expiry
//! - [`operational`]: store introspection for operators
//! - [`services`]: todo, profile and admin services using the cache
//!
//! and exposes the health, metrics and `/admin/store` endpoints over axum.

pub mod cache;
pub mod error;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod operational;
pub mod rate_limit;
pub mod server;
pub mod services;
pub mod session;
pub mod settings;
pub mod state;

#[cfg(test)]
mod testing;

pub use error::AppError;
pub use server::{create_router, run_server};
pub use settings::Settings;
pub use state::AppState;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_defined() {
        assert!(!version().is_empty());
    }
}

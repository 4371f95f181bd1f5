//! Metrics module for the Kestrel server.

pub mod cache;
pub mod http;
pub mod rate_limit;
pub mod setup;

pub use cache::CacheMetrics;
pub use setup::{detached_handle, init_metrics};

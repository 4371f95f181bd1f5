//! Distributed fixed-window rate limiting.
//!
//! The limiter counts requests per client and window in the shared store.
//! The HTTP guard lives in `crate::middleware::rate_limit`.

mod client;
mod limiter;
mod policy;

pub use client::ClientKey;
pub use limiter::{RateLimitDecision, RateLimiter};
pub use policy::{EndpointClass, RateLimitPolicies, RateLimitPolicy};

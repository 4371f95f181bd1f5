//! Read-through cache with write-invalidate semantics.
//!
//! - `keys`: the key taxonomy and namespace patterns
//! - `service`: typed get/set over the shared store
//! - `invalidation`: mutation to invalidation plan mapping

mod invalidation;
mod keys;
mod service;
mod ttl;

pub use invalidation::{InvalidationPlan, InvalidationResult, Mutation};
pub use keys::CacheKey;
pub use service::{CacheService, SESSION_FIELD};
pub use ttl::CacheTtls;

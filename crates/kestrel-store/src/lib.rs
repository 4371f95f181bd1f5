//! Kestrel Store - Shared key-value store adapters
//!
//! This crate provides the [`KeyValueStore`] contract used by the cache,
//! the rate limiter and the session store, plus two backends:
//!
//! - [`MemoryStore`] for development and tests
//! - [`RedisStore`] for deployments where several instances share state

pub mod config;
pub mod error;
pub mod info;
pub mod memory;
pub mod redis;
pub mod traits;

use std::sync::Arc;

pub use config::{StoreBackend, StoreConfig, StoreConfigBuilder};
pub use error::StoreError;
pub use info::{InfoSection, StoreInfo};
pub use memory::MemoryStore;
pub use self::redis::RedisStore;
pub use traits::{HEALTH_CHECK_KEY, KeyValueStore, ttl_seconds};

/// Store handle shared across services.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Opens the backend selected by the configuration.
pub async fn connect(config: &StoreConfig) -> Result<SharedStore, StoreError> {
    config.validate()?;
    let store: SharedStore = match config.backend() {
        StoreBackend::Memory => Arc::new(MemoryStore::from_config(config)),
        StoreBackend::Redis => Arc::new(RedisStore::connect(config).await?),
    };
    tracing::info!(backend = store.name(), "key-value store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let store = connect(&StoreConfig::default()).await.unwrap();
        assert_eq!(store.name(), "memory");
        assert!(store.ping().await.is_ok());
    }
}

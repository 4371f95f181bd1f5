//! Store backend configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Which backend to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store; state is lost on restart and not shared.
    #[default]
    Memory,
    /// Redis server shared by every instance.
    Redis,
}

/// Configuration for the key-value store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    /// Backend kind.
    #[serde(default)]
    backend: StoreBackend,

    /// Connection URL for network backends.
    #[serde(default = "default_url")]
    url: String,

    /// Maximum number of entries held by the in-memory backend.
    #[serde(default = "default_max_capacity")]
    max_capacity: u64,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    connect_timeout_ms: u64,

    /// Per-operation timeout in milliseconds.
    #[serde(default = "default_operation_timeout_ms")]
    operation_timeout_ms: u64,
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_max_capacity() -> u64 {
    100_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_operation_timeout_ms() -> u64 {
    2_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: default_url(),
            max_capacity: default_max_capacity(),
            connect_timeout_ms: default_connect_timeout_ms(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Creates a new builder for StoreConfig.
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Returns the backend kind.
    pub fn backend(&self) -> StoreBackend {
        self.backend
    }

    /// Returns the connection URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the in-memory capacity.
    pub fn max_capacity(&self) -> u64 {
        self.max_capacity
    }

    /// Returns the connection timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the per-operation timeout.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Checks the values loaded from files or the environment.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.backend == StoreBackend::Redis
            && !(self.url.starts_with("redis://") || self.url.starts_with("rediss://"))
        {
            return Err(StoreError::InvalidConfig(format!(
                "url must use the redis:// or rediss:// scheme, got '{}'",
                self.url
            )));
        }
        if self.operation_timeout_ms == 0 {
            return Err(StoreError::InvalidConfig(
                "operation_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for StoreConfig.
#[derive(Debug, Default)]
pub struct StoreConfigBuilder {
    backend: Option<StoreBackend>,
    url: Option<String>,
    max_capacity: Option<u64>,
    connect_timeout: Option<Duration>,
    operation_timeout: Option<Duration>,
}

impl StoreConfigBuilder {
    /// Selects the in-memory backend.
    pub fn memory(mut self) -> Self {
        self.backend = Some(StoreBackend::Memory);
        self
    }

    /// Selects the Redis backend at the given URL.
    pub fn redis(mut self, url: impl Into<String>) -> Self {
        self.backend = Some(StoreBackend::Redis);
        self.url = Some(url.into());
        self
    }

    /// Sets the in-memory capacity.
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the per-operation timeout.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<StoreConfig, StoreError> {
        let config = StoreConfig {
            backend: self.backend.unwrap_or_default(),
            url: self.url.unwrap_or_else(default_url),
            max_capacity: self.max_capacity.unwrap_or_else(default_max_capacity),
            connect_timeout_ms: self
                .connect_timeout
                .map_or_else(default_connect_timeout_ms, |d| d.as_millis() as u64),
            operation_timeout_ms: self
                .operation_timeout
                .map_or_else(default_operation_timeout_ms, |d| d.as_millis() as u64),
        };
        config.validate()?;
        Ok(config)
    }
}

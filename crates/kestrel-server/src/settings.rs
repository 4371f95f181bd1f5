//! Layered server settings.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. optional TOML file (`kestrel.toml`, or the path in `KESTREL_CONFIG`)
//! 3. environment variables such as `KESTREL__STORE__URL`

use std::net::SocketAddr;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use kestrel_store::StoreConfig;
use serde::Deserialize;

use crate::cache::CacheTtls;
use crate::rate_limit::RateLimitPolicies;

/// Default settings file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "kestrel.toml";

/// Variable overriding the settings file path.
pub const CONFIG_PATH_ENV: &str = "KESTREL_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Message(format!("invalid listen address: {}", e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Idle time after which a session stops being valid.
    pub max_inactive_minutes: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_inactive_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreConfig,
    pub cache: CacheTtls,
    pub rate_limit: RateLimitPolicies,
    pub session: SessionSettings,
}

impl Settings {
    /// Loads settings from `KESTREL_CONFIG` (or `kestrel.toml`) and the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(path)
    }

    /// Loads settings from a file that may be missing, then the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings: Self = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("KESTREL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        self.rate_limit
            .validate()
            .map_err(|e| ConfigError::Message(format!("rate_limit: {}", e)))?;
        if self.session.max_inactive_minutes == 0 {
            return Err(ConfigError::Message(
                "session.max_inactive_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

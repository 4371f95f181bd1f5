//! Operational view over the shared store: introspection and bulk clears.
//!
//! Unlike the request-path cache API, every operation here reports store
//! failures to the operator instead of absorbing them.

use chrono::{DateTime, Utc};
use glob::Pattern;
use kestrel_core::{SharedClock, UserId};
use kestrel_store::{InfoSection, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::cache::{CacheKey, CacheService, InvalidationResult};

/// Maximum number of keys returned by a listing.
pub const MAX_LISTED_KEYS: usize = 100;

/// Snapshot of the store statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOverview {
    pub backend: String,
    pub info: BTreeMap<String, InfoSection>,
    pub db_size: u64,
    pub timestamp: DateTime<Utc>,
}

/// Keys matching a pattern; `count` is the full match count even when
/// `keys` is truncated.
#[derive(Debug, Clone, Serialize)]
pub struct KeyListing {
    pub pattern: String,
    pub count: usize,
    pub keys: Vec<String>,
}

/// Global cache namespaces that can be cleared in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheNamespace {
    /// `admin:all-users`
    Users,
    /// `admin:all-todos`
    Todos,
    /// `admin:system-stats`
    Stats,
}

impl CacheNamespace {
    fn key(self) -> CacheKey {
        match self {
            Self::Users => CacheKey::AllUsers,
            Self::Todos => CacheKey::AllTodos,
            Self::Stats => CacheKey::SystemStats,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Todos => "todos",
            Self::Stats => "stats",
        }
    }
}

#[derive(Clone)]
pub struct AdminOperationalView {
    cache: CacheService,
    clock: SharedClock,
}

impl AdminOperationalView {
    pub fn new(cache: CacheService, clock: SharedClock) -> Self {
        Self { cache, clock }
    }

    pub async fn info(&self) -> Result<StoreOverview, StoreError> {
        let store = self.cache.store();
        let (info, db_size) = tokio::try_join!(store.info(), store.db_size())?;

        Ok(StoreOverview {
            backend: info.backend,
            info: info.sections,
            db_size,
            timestamp: self.clock.now(),
        })
    }

    /// Lists keys matching a glob pattern, at most [`MAX_LISTED_KEYS`].
    pub async fn keys(&self, pattern: &str) -> Result<KeyListing, StoreError> {
        Pattern::new(pattern).map_err(|e| StoreError::invalid_pattern(pattern, e.msg))?;

        let mut keys = self.cache.store().keys_matching(pattern).await?;
        let count = keys.len();
        keys.truncate(MAX_LISTED_KEYS);

        Ok(KeyListing {
            pattern: pattern.to_string(),
            count,
            keys,
        })
    }

    /// Flushes the whole store, rate-limit counters and sessions included.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        self.cache.invalidate_all_cache().await
    }

    /// Clears everything cached under one user's namespace.
    pub async fn clear_user(&self, user: UserId) -> Result<InvalidationResult, StoreError> {
        self.cache.invalidate_user_cache(user).await
    }

    /// Clears one global aggregate. Returns the number of keys removed.
    pub async fn clear_namespace(&self, namespace: CacheNamespace) -> Result<u64, StoreError> {
        let removed = self.cache.try_delete(&namespace.key()).await?;
        info!(namespace = namespace.as_str(), removed = removed, "Cache namespace cleared");
        Ok(removed)
    }

    /// Acknowledges a warm-up request. Entries are repopulated lazily by
    /// the read-through path.
    pub fn warm(&self) -> &'static str {
        info!("Cache warm requested");
        "Cache warming initiated"
    }
}

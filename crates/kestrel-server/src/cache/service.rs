//! Typed read-through cache over the shared key-value store.

use std::future::Future;
use std::time::{Duration, Instant};

use kestrel_core::{SystemStats, Todo, User, UserId, UserSummary};
use kestrel_store::{SharedStore, StoreError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::cache::keys::CacheKey;
use crate::cache::ttl::CacheTtls;
use crate::metrics::CacheMetrics;

/// Hash field holding the serialized session under `session:{id}`.
pub const SESSION_FIELD: &str = "data";

/// Cache of JSON snapshots keyed by [`CacheKey`].
///
/// Store failures never reach the caller on the read path: a failed or
/// undecodable read is a miss. Writes and deletes log a warning and carry on.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use kestrel_server::cache::{CacheKey, CacheService, CacheTtls};
/// use kestrel_store::MemoryStore;
///
/// # #[tokio::main]
/// # async fn main() {
/// let cache = CacheService::new(Arc::new(MemoryStore::new(1_000)), CacheTtls::default());
///
/// cache.set(&CacheKey::AllUsers, &vec!["ana"], Duration::from_secs(60)).await;
/// let users: Option<Vec<String>> = cache.get(&CacheKey::AllUsers).await;
/// assert_eq!(users, Some(vec!["ana".to_string()]));
/// # }
/// ```
#[derive(Clone)]
pub struct CacheService {
    store: SharedStore,
    ttls: CacheTtls,
    metrics: CacheMetrics,
}

impl CacheService {
    /// Crea un nuevo cache sobre el store dado.
    pub fn new(store: SharedStore, ttls: CacheTtls) -> Self {
        Self {
            store,
            ttls,
            metrics: CacheMetrics::new(),
        }
    }

    /// Underlying store handle.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn ttls(&self) -> &CacheTtls {
        &self.ttls
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Reads and decodes a cached value.
    ///
    /// Returns `None` on a miss, on a store failure and on a payload that
    /// does not decode as `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let rendered = key.to_string();
        let start = Instant::now();
        let result = self.store.get(&rendered).await;
        self.metrics
            .record_operation_duration("get", start.elapsed());

        let raw = match result {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.metrics.record_miss(key.namespace());
                return None;
            }
            Err(e) => {
                warn!(key = %rendered, error = %e, "Cache read failed, treating as miss");
                self.metrics.record_store_error("get");
                self.metrics.record_miss(key.namespace());
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                self.metrics.record_hit(key.namespace());
                Some(value)
            }
            Err(e) => {
                warn!(key = %rendered, error = %e, "Malformed cache payload, treating as miss");
                self.metrics.record_malformed(key.namespace());
                self.metrics.record_miss(key.namespace());
                None
            }
        }
    }

    /// Serializes and stores a value with the given TTL.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let rendered = key.to_string();
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %rendered, error = %e, "Failed to serialize cache value");
                return;
            }
        };

        let start = Instant::now();
        let result = self.store.set(&rendered, &payload, Some(ttl)).await;
        self.metrics
            .record_operation_duration("set", start.elapsed());

        match result {
            Ok(()) => debug!(key = %rendered, ttl_secs = ttl.as_secs(), "Cache entry stored"),
            Err(e) => {
                warn!(key = %rendered, error = %e, "Cache write failed");
                self.metrics.record_store_error("set");
            }
        }
    }

    /// Read-through helper: returns the cached value or computes, stores and
    /// returns a fresh one. Errors from `compute` are returned unchanged and
    /// nothing is cached.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get(key).await {
            return Ok(cached);
        }
        let value = compute().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }

    /// Removes a key, surfacing store failures.
    pub async fn try_delete(&self, key: &CacheKey) -> Result<u64, StoreError> {
        let removed = self.store.delete(&key.to_string()).await?;
        self.metrics.record_invalidated(removed);
        Ok(removed)
    }

    /// Removes a key. Returns 0 when the key was absent or the store failed.
    pub async fn delete(&self, key: &CacheKey) -> u64 {
        match self.try_delete(key).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache delete failed");
                self.metrics.record_store_error("delete");
                0
            }
        }
    }

    /// Returns true if the key is present. Store failures read as absent.
    pub async fn exists(&self, key: &CacheKey) -> bool {
        match self.store.exists(&key.to_string()).await {
            Ok(present) => present,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache exists check failed");
                self.metrics.record_store_error("exists");
                false
            }
        }
    }

    // Per-user data

    pub async fn get_user_todos(&self, user: UserId) -> Option<Vec<Todo>> {
        self.get(&CacheKey::UserTodos(user)).await
    }

    pub async fn set_user_todos(&self, user: UserId, todos: &[Todo]) {
        self.set(&CacheKey::UserTodos(user), todos, self.ttls.user_todos())
            .await
    }

    pub async fn invalidate_user_todos(&self, user: UserId) -> u64 {
        self.delete(&CacheKey::UserTodos(user)).await
    }

    pub async fn get_user_profile(&self, user: UserId) -> Option<User> {
        self.get(&CacheKey::UserProfile(user)).await
    }

    pub async fn set_user_profile(&self, user: UserId, profile: &User) {
        self.set(&CacheKey::UserProfile(user), profile, self.ttls.user_profile())
            .await
    }

    pub async fn invalidate_user_profile(&self, user: UserId) -> u64 {
        self.delete(&CacheKey::UserProfile(user)).await
    }

    // Global aggregates

    pub async fn get_all_users(&self) -> Option<Vec<UserSummary>> {
        self.get(&CacheKey::AllUsers).await
    }

    pub async fn set_all_users(&self, users: &[UserSummary]) {
        self.set(&CacheKey::AllUsers, users, self.ttls.all_users())
            .await
    }

    pub async fn invalidate_all_users(&self) -> u64 {
        self.delete(&CacheKey::AllUsers).await
    }

    pub async fn get_all_todos(&self) -> Option<Vec<Todo>> {
        self.get(&CacheKey::AllTodos).await
    }

    pub async fn set_all_todos(&self, todos: &[Todo]) {
        self.set(&CacheKey::AllTodos, todos, self.ttls.all_todos())
            .await
    }

    pub async fn invalidate_all_todos(&self) -> u64 {
        self.delete(&CacheKey::AllTodos).await
    }

    pub async fn get_system_stats(&self) -> Option<SystemStats> {
        self.get(&CacheKey::SystemStats).await
    }

    pub async fn set_system_stats(&self, stats: &SystemStats) {
        self.set(&CacheKey::SystemStats, stats, self.ttls.system_stats())
            .await
    }

    pub async fn invalidate_system_stats(&self) -> u64 {
        self.delete(&CacheKey::SystemStats).await
    }

    // Sessions

    /// Stores a session as the `data` field of `session:{id}` and re-applies
    /// the session TTL in the same store command.
    pub async fn set_user_session<T: Serialize>(&self, user: UserId, session: &T) {
        let key = CacheKey::Session(user).to_string();
        let Some(payload) = encode_session(&key, session) else {
            return;
        };

        if let Err(e) = self
            .store
            .hash_set_with_ttl(&key, SESSION_FIELD, &payload, self.ttls.session())
            .await
        {
            warn!(key = %key, error = %e, "Session write failed");
            self.metrics.record_store_error("session_write");
        }
    }

    /// Rewrites an existing session and re-applies the TTL. A session
    /// deleted in the meantime stays deleted. Returns true when written.
    pub async fn refresh_user_session<T: Serialize>(&self, user: UserId, session: &T) -> bool {
        let key = CacheKey::Session(user).to_string();
        let Some(payload) = encode_session(&key, session) else {
            return false;
        };

        match self
            .store
            .hash_update_with_ttl(&key, SESSION_FIELD, &payload, self.ttls.session())
            .await
        {
            Ok(written) => written,
            Err(e) => {
                warn!(key = %key, error = %e, "Session refresh failed");
                self.metrics.record_store_error("session_write");
                false
            }
        }
    }

    /// Reads a session. Missing, unreadable and malformed sessions are `None`.
    pub async fn get_user_session<T: DeserializeOwned>(&self, user: UserId) -> Option<T> {
        let key = CacheKey::Session(user);
        let raw = match self
            .store
            .hash_get(&key.to_string(), SESSION_FIELD)
            .await
        {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %key, error = %e, "Session read failed");
                self.metrics.record_store_error("session_read");
                return None;
            }
        };

        serde_json::from_str(&raw)
            .inspect_err(|e| {
                warn!(key = %key, error = %e, "Malformed session payload");
                self.metrics.record_malformed(key.namespace());
            })
            .ok()
    }

    pub async fn delete_user_session(&self, user: UserId) -> u64 {
        self.delete(&CacheKey::Session(user)).await
    }

    // Bulk operations

    /// Removes every key in the store.
    pub async fn invalidate_all_cache(&self) -> Result<(), StoreError> {
        self.store.flush_all().await?;
        tracing::info!("All cache entries flushed");
        Ok(())
    }

    /// Pre-populates one user's todo list and profile.
    pub async fn warm_user_cache(&self, user: UserId, todos: &[Todo], profile: &User) {
        tokio::join!(
            self.set_user_todos(user, todos),
            self.set_user_profile(user, profile)
        );
    }
}

fn encode_session<T: Serialize>(key: &str, session: &T) -> Option<String> {
    serde_json::to_string(session)
        .inspect_err(|e| warn!(key = %key, error = %e, "Failed to serialize session"))
        .ok()
}

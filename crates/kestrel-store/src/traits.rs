//! Key-value store trait definition.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::StoreError;
use crate::info::StoreInfo;

/// Key written by the default [`KeyValueStore::ping`] round trip.
pub const HEALTH_CHECK_KEY: &str = "health-check";

/// A shared, network-accessible key-value store.
///
/// Every operation is a single independent round trip; implementations hold
/// no lock across calls. Callers must assume other processes mutate the same
/// keys concurrently.
///
/// # Implementors
///
/// - `MemoryStore` - In-process store for development and tests
/// - `RedisStore` - Redis server reached through a multiplexed connection
///
/// # Errors
///
/// Every operation may fail with `StoreError::Unavailable` or
/// `StoreError::Timeout`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a plain value.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a plain value, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Removes a key. Returns the number of keys removed (0 or 1).
    async fn delete(&self, key: &str) -> Result<u64, StoreError>;

    /// Removes several keys, returning how many existed.
    async fn delete_many(&self, keys: &[String]) -> Result<u64, StoreError> {
        let mut removed = 0;
        for key in keys {
            removed += self.delete(key).await?;
        }
        Ok(removed)
    }

    /// Returns true if the key exists.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically increments an integer value, creating it at 1 when absent.
    /// The TTL of an existing key is preserved.
    async fn increment(&self, key: &str) -> Result<i64, StoreError>;

    /// Sets a TTL on an existing key. Returns false when the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Increments a counter and arms `ttl` when the counter carries none.
    ///
    /// A counter written through this method never outlives `ttl` after its
    /// creation. The default issues `increment` then `expire`; when the
    /// expire fails the fresh counter is deleted and the count is still
    /// returned. Backends override it with a single atomic command.
    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let count = self.increment(key).await?;
        if count == 1 {
            if let Err(e) = self.expire(key, ttl).await {
                warn!(key = %key, error = %e, "failed to arm counter ttl, dropping counter");
                self.delete(key).await?;
            }
        }
        Ok(count)
    }

    /// Lists keys matching a glob pattern (`*`, `?`, `[...]`, `[!...]`).
    /// Every backend matches the same dialect; metacharacters are taken
    /// literally inside brackets (`[*]`).
    ///
    /// Cost grows with the size of the store; reserved for operational
    /// tooling, never for steady-state request handling.
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// Writes one field of a hash record.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// Writes one field of a hash record and replaces the record TTL.
    ///
    /// The default removes the record when the TTL cannot be applied, so a
    /// failed call never leaves a record without expiry.
    async fn hash_set_with_ttl(
        &self,
        key: &str,
        field: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.hash_set(key, field, value).await?;
        if let Err(e) = self.expire(key, ttl).await {
            self.delete(key).await?;
            return Err(e);
        }
        Ok(())
    }

    /// Like [`KeyValueStore::hash_set_with_ttl`], but only when the record
    /// still exists. Returns false, writing nothing, when it is absent.
    ///
    /// The default checks then writes; backends override it atomically.
    async fn hash_update_with_ttl(
        &self,
        key: &str,
        field: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        if !self.exists(key).await? {
            return Ok(false);
        }
        self.hash_set_with_ttl(key, field, value, ttl).await?;
        Ok(true)
    }

    /// Reads one field of a hash record.
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// Removes every key.
    async fn flush_all(&self) -> Result<(), StoreError>;

    /// Number of live keys.
    async fn db_size(&self) -> Result<u64, StoreError>;

    /// Sectioned statistics about the store.
    async fn info(&self) -> Result<StoreInfo, StoreError>;

    /// Verifies the store with a write/read/delete round trip.
    ///
    /// Fails if the value read back differs from the one written.
    async fn ping(&self) -> Result<(), StoreError> {
        self.set(HEALTH_CHECK_KEY, "ok", Some(Duration::from_secs(10)))
            .await?;
        let echoed = self.get(HEALTH_CHECK_KEY).await?;
        if echoed.as_deref() != Some("ok") {
            return Err(StoreError::Command(format!(
                "health check echoed {:?}",
                echoed
            )));
        }
        self.delete(HEALTH_CHECK_KEY).await?;
        Ok(())
    }

    /// Name of this backend, used for logging and reports.
    fn name(&self) -> &str;
}

/// Rounds a TTL up to whole seconds, never below one.
pub fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

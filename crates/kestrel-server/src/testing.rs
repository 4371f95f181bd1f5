//! Store double for exercising partial store failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kestrel_store::{KeyValueStore, MemoryStore, StoreError, StoreInfo};

/// Wraps a [`MemoryStore`] and injects faults into single commands.
///
/// Only the primitive commands are forwarded, so the composite ones run
/// through the trait defaults and hit the injected faults.
#[derive(Clone)]
pub struct FaultyStore {
    inner: MemoryStore,
    failing_expires: Arc<AtomicUsize>,
    drop_after_hash_read: Arc<AtomicBool>,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failing_expires: Arc::new(AtomicUsize::new(0)),
            drop_after_hash_read: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes the next `count` expire commands fail.
    pub fn fail_next_expires(&self, count: usize) {
        self.failing_expires.store(count, Ordering::SeqCst);
    }

    /// Deletes a hash record right after it is read, as a concurrent
    /// logout would.
    pub fn drop_after_hash_read(&self, enabled: bool) {
        self.drop_after_hash_read.store(enabled, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for FaultyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<u64, StoreError> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.exists(key).await
    }

    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        self.inner.increment(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let failing = self
            .failing_expires
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::unavailable("injected expire failure"));
        }
        self.inner.expire(key, ttl).await
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.inner.keys_matching(pattern).await
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.inner.hash_set(key, field, value).await
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let value = self.inner.hash_get(key, field).await?;
        if self.drop_after_hash_read.load(Ordering::SeqCst) {
            self.inner.delete(key).await?;
        }
        Ok(value)
    }

    async fn flush_all(&self) -> Result<(), StoreError> {
        self.inner.flush_all().await
    }

    async fn db_size(&self) -> Result<u64, StoreError> {
        self.inner.db_size().await
    }

    async fn info(&self) -> Result<StoreInfo, StoreError> {
        self.inner.info().await
    }

    fn name(&self) -> &str {
        "faulty"
    }
}

//! In-process key-value store backed by Moka.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use glob::Pattern;
use kestrel_core::{SharedClock, system_clock};
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::Op;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::info::StoreInfo;
use crate::traits::KeyValueStore;

#[derive(Debug, Clone)]
enum StoredValue {
    Str(String),
    Hash(HashMap<String, String>),
}

/// One stored entry. Expiry is tracked twice: `expires_at_ms` against the
/// injected clock decides visibility, `evict_after` lets Moka reclaim memory.
#[derive(Debug, Clone)]
struct Slot {
    value: StoredValue,
    expires_at_ms: Option<i64>,
    evict_after: Option<Duration>,
}

impl Slot {
    fn new(value: StoredValue, ttl: Option<Duration>, now_ms: i64) -> Self {
        Self {
            value,
            expires_at_ms: ttl.map(|ttl| now_ms.saturating_add(ttl.as_millis() as i64)),
            evict_after: ttl,
        }
    }

    fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at_ms.is_none_or(|at| at > now_ms)
    }

    /// Builds a slot that keeps an existing deadline.
    fn carrying(value: StoredValue, expires_at_ms: Option<i64>, now_ms: i64) -> Self {
        let evict_after =
            expires_at_ms.map(|at| Duration::from_millis(at.saturating_sub(now_ms).max(0) as u64));
        Self {
            value,
            expires_at_ms,
            evict_after,
        }
    }
}

struct SlotExpiry;

impl Expiry<String, Slot> for SlotExpiry {
    fn expire_after_create(&self, _key: &String, value: &Slot, _created_at: Instant) -> Option<Duration> {
        value.evict_after
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Slot,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.evict_after
    }
}

/// In-process [`KeyValueStore`].
///
/// Suitable for a single instance and for tests. State is not shared across
/// processes, so a multi-instance deployment must use the Redis backend.
///
/// # Examples
///
/// ```
/// use kestrel_store::{KeyValueStore, MemoryStore};
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new(1_000);
/// assert_eq!(store.increment("hits").await.unwrap(), 1);
/// assert_eq!(store.increment("hits").await.unwrap(), 2);
/// # }
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    inner: Cache<String, Slot>,
    clock: SharedClock,
    outage: Arc<AtomicBool>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.inner.entry_count())
            .field("clock", &self.clock)
            .finish()
    }
}

impl MemoryStore {
    /// Creates a store holding at most `max_capacity` entries.
    pub fn new(max_capacity: u64) -> Self {
        Self::with_clock(max_capacity, system_clock())
    }

    /// Creates a store whose expiry follows the given clock.
    pub fn with_clock(max_capacity: u64, clock: SharedClock) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(SlotExpiry)
            .eviction_listener(|key, _value, cause| {
                debug!(key = %key, cause = ?cause, "store entry evicted");
            })
            .build();

        Self {
            inner,
            clock,
            outage: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a store from configuration.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.max_capacity())
    }

    /// Makes every subsequent operation fail with `StoreError::Unavailable`
    /// until called again with `false`.
    pub fn simulate_outage(&self, down: bool) {
        if down {
            warn!("memory store switched to simulated outage");
        }
        self.outage.store(down, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("simulated outage"));
        }
        Ok(())
    }

    fn now_ms(&self) -> i64 {
        self.clock.now_millis()
    }

    async fn live_slot(&self, key: &str) -> Option<Slot> {
        let slot = self.inner.get(key).await?;
        if slot.is_live(self.now_ms()) {
            Some(slot)
        } else {
            self.inner.invalidate(key).await;
            None
        }
    }

    fn live_entries(&self) -> impl Iterator<Item = (Arc<String>, Slot)> + '_ {
        let now = self.now_ms();
        self.inner.iter().filter(move |(_, slot)| slot.is_live(now))
    }

    /// Atomic INCR. With `ttl`, a counter that has no deadline gets one.
    async fn add_one(&self, key: &str, ttl: Option<Duration>) -> Result<i64, StoreError> {
        self.ensure_available()?;
        let now = self.now_ms();
        let mut outcome = Ok(0);

        self.inner
            .entry(key.to_string())
            .and_compute_with(|current| {
                let live = current.map(|e| e.into_value()).filter(|s| s.is_live(now));
                let op = match live {
                    None => {
                        outcome = Ok(1);
                        Op::Put(Slot::new(StoredValue::Str("1".to_string()), ttl, now))
                    }
                    Some(Slot {
                        value: StoredValue::Str(raw),
                        expires_at_ms,
                        ..
                    }) => {
                        let next = raw
                            .parse::<i64>()
                            .map_err(|_| StoreError::NotAnInteger {
                                key: key.to_string(),
                            })
                            .and_then(|count| {
                                count.checked_add(1).ok_or_else(|| {
                                    StoreError::Command(format!("increment would overflow '{key}'"))
                                })
                            });
                        match next {
                            Ok(next) => {
                                outcome = Ok(next);
                                let deadline = expires_at_ms.or_else(|| {
                                    ttl.map(|ttl| now.saturating_add(ttl.as_millis() as i64))
                                });
                                Op::Put(Slot::carrying(
                                    StoredValue::Str(next.to_string()),
                                    deadline,
                                    now,
                                ))
                            }
                            Err(err) => {
                                outcome = Err(err);
                                Op::Nop
                            }
                        }
                    }
                    Some(_) => {
                        outcome = Err(StoreError::wrong_type(key));
                        Op::Nop
                    }
                };
                std::future::ready(op)
            })
            .await;

        outcome
    }

    /// Atomic HSET, optionally replacing the TTL. With `only_existing`, an
    /// absent record is left absent. Returns whether the field was written.
    async fn write_field(
        &self,
        key: &str,
        field: &str,
        value: &str,
        ttl: Option<Duration>,
        only_existing: bool,
    ) -> Result<bool, StoreError> {
        self.ensure_available()?;
        let now = self.now_ms();
        let mut outcome = Ok(false);

        self.inner
            .entry(key.to_string())
            .and_compute_with(|current| {
                let live = current.map(|e| e.into_value()).filter(|s| s.is_live(now));
                let op = match live {
                    None if only_existing => Op::Nop,
                    None => {
                        outcome = Ok(true);
                        let fields = HashMap::from([(field.to_string(), value.to_string())]);
                        Op::Put(Slot::new(StoredValue::Hash(fields), ttl, now))
                    }
                    Some(Slot {
                        value: StoredValue::Hash(mut fields),
                        expires_at_ms,
                        ..
                    }) => {
                        outcome = Ok(true);
                        fields.insert(field.to_string(), value.to_string());
                        let value = StoredValue::Hash(fields);
                        Op::Put(match ttl {
                            Some(_) => Slot::new(value, ttl, now),
                            None => Slot::carrying(value, expires_at_ms, now),
                        })
                    }
                    Some(_) => {
                        outcome = Err(StoreError::wrong_type(key));
                        Op::Nop
                    }
                };
                std::future::ready(op)
            })
            .await;

        outcome
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.ensure_available()?;
        match self.live_slot(key).await {
            None => Ok(None),
            Some(Slot {
                value: StoredValue::Str(value),
                ..
            }) => Ok(Some(value)),
            Some(_) => Err(StoreError::wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.ensure_available()?;
        let slot = Slot::new(StoredValue::Str(value.to_string()), ttl, self.now_ms());
        self.inner.insert(key.to_string(), slot).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<u64, StoreError> {
        self.ensure_available()?;
        let removed = self.inner.remove(key).await;
        Ok(removed.filter(|slot| slot.is_live(self.now_ms())).map_or(0, |_| 1))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.ensure_available()?;
        Ok(self.live_slot(key).await.is_some())
    }

    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        self.add_one(key, None).await
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        self.add_one(key, Some(ttl)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.ensure_available()?;
        let now = self.now_ms();
        let mut applied = false;

        self.inner
            .entry(key.to_string())
            .and_compute_with(|current| {
                let op = match current.map(|e| e.into_value()) {
                    Some(slot) if slot.is_live(now) => {
                        applied = true;
                        Op::Put(Slot::new(slot.value, Some(ttl), now))
                    }
                    Some(_) => Op::Remove,
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        Ok(applied)
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_available()?;
        let matcher = Pattern::new(pattern)
            .map_err(|e| StoreError::invalid_pattern(pattern, e.msg))?;

        let mut keys: Vec<String> = self
            .live_entries()
            .filter(|(key, _)| matcher.matches(key))
            .map(|(key, _)| key.to_string())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.write_field(key, field, value, None, false).await.map(|_| ())
    }

    async fn hash_set_with_ttl(
        &self,
        key: &str,
        field: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.write_field(key, field, value, Some(ttl), false)
            .await
            .map(|_| ())
    }

    async fn hash_update_with_ttl(
        &self,
        key: &str,
        field: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.write_field(key, field, value, Some(ttl), true).await
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.ensure_available()?;
        match self.live_slot(key).await {
            None => Ok(None),
            Some(Slot {
                value: StoredValue::Hash(fields),
                ..
            }) => Ok(fields.get(field).cloned()),
            Some(_) => Err(StoreError::wrong_type(key)),
        }
    }

    async fn flush_all(&self) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
        Ok(())
    }

    async fn db_size(&self) -> Result<u64, StoreError> {
        self.ensure_available()?;
        Ok(self.live_entries().count() as u64)
    }

    async fn info(&self) -> Result<StoreInfo, StoreError> {
        self.ensure_available()?;
        let (keys, expires) = self.live_entries().fold((0u64, 0u64), |(keys, expires), (_, slot)| {
            (keys + 1, expires + u64::from(slot.expires_at_ms.is_some()))
        });

        let mut info = StoreInfo::new(self.name());
        info.insert("server", "backend", self.name());
        info.insert("server", "version", env!("CARGO_PKG_VERSION"));
        info.insert("keyspace", "keys", keys);
        info.insert("keyspace", "expires", expires);
        info.insert("memory", "weighted_size", self.inner.weighted_size());
        if let Some(capacity) = self.inner.policy().max_capacity() {
            info.insert("memory", "max_capacity", capacity);
        }
        Ok(info)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

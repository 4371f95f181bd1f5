//! Redis-backed key-value store.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use glob::Pattern;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, AsyncIter, RedisResult, Script};
use tracing::{info, instrument};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::info::{StoreInfo, parse_info};
use crate::traits::{KeyValueStore, ttl_seconds};

/// INCR that arms the expiry of any counter left without one.
const INCREMENT_WITH_TTL: &str = r"
local count = redis.call('INCR', KEYS[1])
if redis.call('PTTL', KEYS[1]) == -1 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return count
";

/// HSET plus PEXPIRE, skipped when the record is gone.
const HASH_UPDATE_WITH_TTL: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return 0
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
redis.call('PEXPIRE', KEYS[1], ARGV[3])
return 1
";

/// [`KeyValueStore`] over a Redis server.
///
/// Commands share one multiplexed connection that reconnects on its own.
/// Each command is bounded by the configured operation timeout.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    operation_timeout: Duration,
    increment_script: Script,
    hash_update_script: Script,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to the server named in the configuration.
    #[instrument(skip(config), fields(url = %config.url()))]
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.url())
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;

        let timeout = config.connect_timeout();
        let conn = tokio::time::timeout(timeout, client.get_connection_manager())
            .await
            .map_err(|_| StoreError::Timeout {
                millis: timeout.as_millis() as u64,
            })??;

        info!("connected to redis");
        Ok(Self {
            conn,
            operation_timeout: config.operation_timeout(),
            increment_script: Script::new(INCREMENT_WITH_TTL),
            hash_update_script: Script::new(HASH_UPDATE_WITH_TTL),
        })
    }

    async fn run<T, F>(&self, command: F) -> Result<T, StoreError>
    where
        F: Future<Output = RedisResult<T>> + Send,
    {
        match tokio::time::timeout(self.operation_timeout, command).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout {
                millis: self.operation_timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        self.run(conn.get(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => self.run(conn.set_ex(key, value, ttl_seconds(ttl))).await,
            None => self.run(conn.set(key, value)).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        self.run(conn.del(key)).await
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        self.run(conn.del(keys)).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        self.run(conn.exists(key)).await
    }

    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        self.run(conn.incr(key, 1i64)).await
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let count: i64 = self
            .run(
                self.increment_script
                    .key(key)
                    .arg(ttl_millis(ttl))
                    .invoke_async(&mut conn),
            )
            .await?;
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        self.run(conn.expire(key, ttl_seconds(ttl) as i64)).await
    }

    /// Walks the keyspace with `SCAN` so the server is never blocked.
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        Pattern::new(pattern).map_err(|e| StoreError::invalid_pattern(pattern, e.msg))?;
        let translated = redis_pattern(pattern);

        let mut conn = self.conn.clone();
        let scan = async move {
            let mut iter: AsyncIter<'_, String> = conn.scan_match(&translated).await?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            Ok::<_, redis::RedisError>(keys)
        };

        let mut keys: Vec<String> = self.run(scan).await?;
        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        self.run(conn.hset(key, field, value)).await
    }

    async fn hash_set_with_ttl(
        &self,
        key: &str,
        field: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset(key, field, value)
            .ignore()
            .pexpire(key, ttl_millis(ttl))
            .ignore();
        self.run(pipe.query_async::<()>(&mut conn)).await
    }

    async fn hash_update_with_ttl(
        &self,
        key: &str,
        field: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let written: i64 = self
            .run(
                self.hash_update_script
                    .key(key)
                    .arg(field)
                    .arg(value)
                    .arg(ttl_millis(ttl))
                    .invoke_async(&mut conn),
            )
            .await?;
        Ok(written == 1)
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        self.run(conn.hget(key, field)).await
    }

    async fn flush_all(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        self.run(redis::cmd("FLUSHALL").query_async::<()>(&mut conn))
            .await
    }

    async fn db_size(&self) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        self.run(redis::cmd("DBSIZE").query_async::<u64>(&mut conn))
            .await
    }

    async fn info(&self) -> Result<StoreInfo, StoreError> {
        let mut conn = self.conn.clone();
        let raw: String = self
            .run(redis::cmd("INFO").query_async::<String>(&mut conn))
            .await?;

        Ok(StoreInfo {
            backend: self.name().to_string(),
            sections: parse_info(&raw),
        })
    }

    fn name(&self) -> &str {
        "redis"
    }
}

/// TTL in whole milliseconds, never below one.
fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX).max(1)
}

/// Rewrites a `glob` pattern in the dialect Redis matches with.
///
/// Redis negates classes with `^` and treats `\` as an escape, while `glob`
/// negates with `!` and has no escapes. Input must already be a valid glob.
fn redis_pattern(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 4);
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '[' => {
                out.push('[');
                if chars.next_if_eq(&'!').is_some() {
                    out.push('^');
                } else if chars.next_if_eq(&'^').is_some() {
                    out.push_str("\\^");
                }
                // A leading `]` is a literal member in glob
                if chars.next_if_eq(&']').is_some() {
                    out.push_str("\\]");
                }
                while let Some(c) = chars.next() {
                    match c {
                        ']' => {
                            out.push(']');
                            break;
                        }
                        '\\' => out.push_str("\\\\"),
                        '-' if chars.peek() == Some(&']') => out.push_str("\\-"),
                        c => out.push(c),
                    }
                }
            }
            c => out.push(c),
        }
    }
    out
}

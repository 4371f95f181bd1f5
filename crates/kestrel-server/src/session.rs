//! Per-user session records kept in the shared store.

use chrono::{DateTime, Utc};
use kestrel_core::{Role, SharedClock, UserId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::CacheService;

/// Session of an authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    pub login_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Data supplied by the authentication layer when a login succeeds.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewSession {
    pub fn new(user_id: UserId, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
            ip_address: None,
            user_agent: None,
        }
    }

    /// Attaches client metadata.
    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// Session store on top of [`CacheService`].
///
/// Every write re-applies the session TTL, so the store expiry is measured
/// from the last activity. Inactivity checks are logical and never delete.
#[derive(Clone)]
pub struct SessionStore {
    cache: CacheService,
    clock: SharedClock,
}

impl SessionStore {
    pub fn new(cache: CacheService, clock: SharedClock) -> Self {
        Self { cache, clock }
    }

    /// Stores a fresh session stamped with the current time.
    pub async fn create(&self, new: NewSession) -> UserSession {
        let now = self.clock.now();
        let session = UserSession {
            user_id: new.user_id,
            username: new.username,
            role: new.role,
            login_time: now,
            last_activity: now,
            ip_address: new.ip_address,
            user_agent: new.user_agent,
        };

        self.cache
            .set_user_session(session.user_id, &session)
            .await;
        debug!(user = %session.user_id, "Session created");
        session
    }

    pub async fn get(&self, user: UserId) -> Option<UserSession> {
        self.cache.get_user_session(user).await
    }

    /// Refreshes `lastActivity`. Returns the updated session, or `None` when
    /// the user has no session or it could not be written. A session deleted
    /// while the touch is in flight is not recreated.
    pub async fn touch(&self, user: UserId) -> Option<UserSession> {
        let mut session = self.get(user).await?;
        session.last_activity = self.clock.now();
        self.cache
            .refresh_user_session(user, &session)
            .await
            .then_some(session)
    }

    /// False when the session is missing or idle for longer than
    /// `max_inactive_minutes`.
    pub async fn is_valid(&self, user: UserId, max_inactive_minutes: u64) -> bool {
        let Some(session) = self.get(user).await else {
            return false;
        };

        let idle_ms = self.clock.now_millis() - session.last_activity.timestamp_millis();
        let max_idle_ms = i64::try_from(max_inactive_minutes.saturating_mul(60_000)).unwrap_or(i64::MAX);
        idle_ms <= max_idle_ms
    }

    /// Removes the session (logout or explicit invalidation).
    pub async fn delete(&self, user: UserId) -> bool {
        let removed = self.cache.delete_user_session(user).await > 0;
        debug!(user = %user, removed = removed, "Session deleted");
        removed
    }
}

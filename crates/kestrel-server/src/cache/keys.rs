//! Cache key taxonomy.

use std::fmt;

use glob::Pattern;
use kestrel_core::UserId;

/// Key of a cached value in the shared store.
///
/// The namespace prefix decides the invalidation scope: everything under
/// `user:{id}:` belongs to one user, `admin:` holds global aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// `user:{id}:todos`
    UserTodos(UserId),
    /// `user:{id}:profile`
    UserProfile(UserId),
    /// `admin:all-users`
    AllUsers,
    /// `admin:all-todos`
    AllTodos,
    /// `admin:system-stats`
    SystemStats,
    /// `session:{id}`
    Session(UserId),
    /// `rate_limit:{client}:{window_start}`
    RateLimit { client: String, window_start: i64 },
}

impl CacheKey {
    /// Creates a rate-limit window key.
    ///
    /// # Examples
    ///
    /// ```
    /// use kestrel_server::cache::CacheKey;
    ///
    /// let key = CacheKey::rate_limit("user:7", 1_700_000_040_000);
    /// assert_eq!(key.to_string(), "rate_limit:user:7:1700000040000");
    /// ```
    pub fn rate_limit(client: impl Into<String>, window_start: i64) -> Self {
        Self::RateLimit {
            client: client.into(),
            window_start,
        }
    }

    /// Returns the namespace prefix of this key.
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::UserTodos(_) | Self::UserProfile(_) => "user",
            Self::AllUsers | Self::AllTodos | Self::SystemStats => "admin",
            Self::Session(_) => "session",
            Self::RateLimit { .. } => "rate_limit",
        }
    }

    /// Glob matching every key owned by one user (`user:{id}:*`).
    pub fn user_namespace(user: UserId) -> String {
        format!("user:{}:*", user)
    }

    /// Glob matching every window of one rate-limit client. The client is
    /// matched literally.
    pub fn rate_limit_windows(client: &str) -> String {
        format!("rate_limit:{}:*", Pattern::escape(client))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserTodos(id) => write!(f, "user:{}:todos", id),
            Self::UserProfile(id) => write!(f, "user:{}:profile", id),
            Self::AllUsers => f.write_str("admin:all-users"),
            Self::AllTodos => f.write_str("admin:all-todos"),
            Self::SystemStats => f.write_str("admin:system-stats"),
            Self::Session(id) => write!(f, "session:{}", id),
            Self::RateLimit {
                client,
                window_start,
            } => write!(f, "rate_limit:{}:{}", client, window_start),
        }
    }
}

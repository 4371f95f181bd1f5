//! Cache TTL configuration.

use std::time::Duration;

use serde::Deserialize;

/// Time-to-live of each cached value kind, in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheTtls {
    /// Per-user todo lists (default: 300)
    pub user_todos_ttl_secs: u64,
    /// Per-user profile (default: 600)
    pub user_profile_ttl_secs: u64,
    /// Admin user listing (default: 300)
    pub all_users_ttl_secs: u64,
    /// Admin todo listing (default: 300)
    pub all_todos_ttl_secs: u64,
    /// Dashboard counters (default: 180)
    pub system_stats_ttl_secs: u64,
    /// Session backstop (default: 86400 = 24 horas)
    pub session_ttl_secs: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            user_todos_ttl_secs: 300,
            user_profile_ttl_secs: 600,
            all_users_ttl_secs: 300,
            all_todos_ttl_secs: 300,
            system_stats_ttl_secs: 180,
            session_ttl_secs: 86_400,
        }
    }
}

impl CacheTtls {
    pub fn user_todos(&self) -> Duration {
        Duration::from_secs(self.user_todos_ttl_secs)
    }

    pub fn user_profile(&self) -> Duration {
        Duration::from_secs(self.user_profile_ttl_secs)
    }

    pub fn all_users(&self) -> Duration {
        Duration::from_secs(self.all_users_ttl_secs)
    }

    pub fn all_todos(&self) -> Duration {
        Duration::from_secs(self.all_todos_ttl_secs)
    }

    pub fn system_stats(&self) -> Duration {
        Duration::from_secs(self.system_stats_ttl_secs)
    }

    pub fn session(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ttls = CacheTtls::default();
        assert_eq!(ttls.user_profile(), Duration::from_secs(600));
        assert_eq!(ttls.system_stats(), Duration::from_secs(180));
        assert_eq!(ttls.session(), Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn test_partial_override() {
        let ttls: CacheTtls = serde_json::from_str(r#"{"system_stats_ttl_secs": 30}"#).unwrap();
        assert_eq!(ttls.system_stats(), Duration::from_secs(30));
        assert_eq!(ttls.user_todos(), Duration::from_secs(300));
    }
}

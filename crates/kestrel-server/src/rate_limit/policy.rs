//! Rate limit policies.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Window length and request budget applied to one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Requests admitted per window.
    pub max_requests: u64,
}

impl RateLimitPolicy {
    /// Login and registration: 5 attempts per 15 minutes.
    pub const AUTH: Self = Self::new(15 * 60 * 1000, 5);
    /// General API: 100 requests per minute.
    pub const API: Self = Self::new(60 * 1000, 100);
    /// Admin API: 200 requests per minute.
    pub const ADMIN: Self = Self::new(60 * 1000, 200);

    pub const fn new(window_ms: u64, max_requests: u64) -> Self {
        Self {
            window_ms,
            max_requests,
        }
    }

    /// Start of the window containing `now_ms`:
    /// `floor(now / window) * window`.
    ///
    /// # Examples
    ///
    /// ```
    /// use kestrel_server::rate_limit::RateLimitPolicy;
    ///
    /// let policy = RateLimitPolicy::new(60_000, 10);
    /// assert_eq!(policy.window_start(125_000), 120_000);
    /// assert_eq!(policy.reset_time(125_000), 180_000);
    /// ```
    pub fn window_start(&self, now_ms: i64) -> i64 {
        let window = self.window_ms.max(1) as i64;
        now_ms.div_euclid(window) * window
    }

    /// End of the window containing `now_ms`.
    pub fn reset_time(&self, now_ms: i64) -> i64 {
        self.window_start(now_ms) + self.window_ms.max(1) as i64
    }

    /// TTL of a window counter: the window length rounded up to seconds.
    pub fn counter_ttl(&self) -> Duration {
        Duration::from_secs(self.window_ms.div_ceil(1000).max(1))
    }

    /// Checks that the policy can admit anything at all.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.window_ms == 0 {
            return Err("window_ms must be positive");
        }
        if self.max_requests == 0 {
            return Err("max_requests must be positive");
        }
        Ok(())
    }
}

/// Endpoint group a policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointClass {
    Auth,
    Api,
    Admin,
}

impl EndpointClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Api => "api",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy per endpoint class, overridable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitPolicies {
    pub auth: RateLimitPolicy,
    pub api: RateLimitPolicy,
    pub admin: RateLimitPolicy,
}

impl Default for RateLimitPolicies {
    fn default() -> Self {
        Self {
            auth: RateLimitPolicy::AUTH,
            api: RateLimitPolicy::API,
            admin: RateLimitPolicy::ADMIN,
        }
    }
}

impl RateLimitPolicies {
    /// Returns the policy for an endpoint class.
    pub fn for_class(&self, class: EndpointClass) -> RateLimitPolicy {
        match class {
            EndpointClass::Auth => self.auth,
            EndpointClass::Api => self.api,
            EndpointClass::Admin => self.admin,
        }
    }

    /// Validates every policy, naming the offending class.
    pub fn validate(&self) -> Result<(), String> {
        for class in [EndpointClass::Auth, EndpointClass::Api, EndpointClass::Admin] {
            self.for_class(class)
                .validate()
                .map_err(|reason| format!("rate_limit.{}: {}", class, reason))?;
        }
        Ok(())
    }
}

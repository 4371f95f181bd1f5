//! Fixed-window counter rate limiter.

use chrono::{DateTime, SecondsFormat, Utc};
use kestrel_core::SharedClock;
use kestrel_store::{SharedStore, StoreError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::CacheKey;
use crate::metrics::rate_limit::{DecisionOutcome, record_decision, record_reset};
use crate::rate_limit::client::ClientKey;
use crate::rate_limit::policy::{EndpointClass, RateLimitPolicies, RateLimitPolicy};

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    /// True when the request must be rejected.
    pub limited: bool,
    /// Requests admitted per window.
    pub limit: u64,
    /// Requests left in the window, never negative.
    pub remaining: u64,
    /// End of the current window, epoch milliseconds.
    pub reset_time_ms: i64,
    /// Counter value after this request (0 when degraded).
    pub count: i64,
    /// True when the store failed and the request was admitted anyway.
    pub degraded: bool,
}

impl RateLimitDecision {
    fn from_count(policy: &RateLimitPolicy, count: i64, reset_time_ms: i64) -> Self {
        let max = i64::try_from(policy.max_requests).unwrap_or(i64::MAX);
        Self {
            limited: count > max,
            limit: policy.max_requests,
            remaining: max.saturating_sub(count).max(0) as u64,
            reset_time_ms,
            count,
            degraded: false,
        }
    }

    fn fail_open(policy: &RateLimitPolicy, reset_time_ms: i64) -> Self {
        Self {
            limited: false,
            limit: policy.max_requests,
            remaining: policy.max_requests,
            reset_time_ms,
            count: 0,
            degraded: true,
        }
    }

    /// Seconds until the window resets, rounded up.
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let wait_ms = self.reset_time_ms.saturating_sub(now_ms).max(0) as u64;
        wait_ms.div_ceil(1000)
    }

    /// Window end as a UTC timestamp.
    pub fn reset_time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.reset_time_ms).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Window end in RFC 3339 with millisecond precision.
    pub fn reset_time_rfc3339(&self) -> String {
        self.reset_time()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Distributed fixed-window rate limiter.
///
/// Windows are counted in the shared store under
/// `rate_limit:{client}:{window_start}`, so every instance sees the same
/// budget. Boundary bursts of up to twice the budget across two adjacent
/// windows are accepted.
#[derive(Clone)]
pub struct RateLimiter {
    store: SharedStore,
    clock: SharedClock,
    policies: RateLimitPolicies,
}

impl RateLimiter {
    pub fn new(store: SharedStore, clock: SharedClock, policies: RateLimitPolicies) -> Self {
        Self {
            store,
            clock,
            policies,
        }
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn policies(&self) -> &RateLimitPolicies {
        &self.policies
    }

    /// Checks a request against the policy of an endpoint class.
    pub async fn check(&self, client: &ClientKey, class: EndpointClass) -> RateLimitDecision {
        self.check_policy(client, &self.policies.for_class(class), class.as_str())
            .await
    }

    /// Checks a request against an explicit policy.
    ///
    /// Fails open: when the store errors the request is admitted and the
    /// decision is flagged `degraded`.
    pub async fn check_policy(
        &self,
        client: &ClientKey,
        policy: &RateLimitPolicy,
        label: &'static str,
    ) -> RateLimitDecision {
        let now = self.clock.now_millis();

        match self.count_request(client, policy, now).await {
            Ok(decision) => {
                let outcome = if decision.limited {
                    debug!(client = %client, policy = label, count = decision.count, "Rate limit exceeded");
                    DecisionOutcome::Limited
                } else {
                    DecisionOutcome::Admitted
                };
                record_decision(label, outcome);
                decision
            }
            Err(e) => {
                warn!(client = %client, policy = label, error = %e, "Rate limit store unavailable, admitting request");
                record_decision(label, DecisionOutcome::Degraded);
                RateLimitDecision::fail_open(policy, policy.reset_time(now))
            }
        }
    }

    /// Increments the window counter and derives the decision.
    async fn count_request(
        &self,
        client: &ClientKey,
        policy: &RateLimitPolicy,
        now_ms: i64,
    ) -> Result<RateLimitDecision, StoreError> {
        let window_start = policy.window_start(now_ms);
        let key = CacheKey::rate_limit(client.to_string(), window_start).to_string();

        let count = self
            .store
            .increment_with_ttl(&key, policy.counter_ttl())
            .await?;

        Ok(RateLimitDecision::from_count(
            policy,
            count,
            policy.reset_time(now_ms),
        ))
    }

    /// Counter value of the client's current window, without counting.
    pub async fn current_count(
        &self,
        client: &ClientKey,
        policy: &RateLimitPolicy,
    ) -> Result<i64, StoreError> {
        let window_start = policy.window_start(self.clock.now_millis());
        let key = CacheKey::rate_limit(client.to_string(), window_start).to_string();

        Ok(self
            .store
            .get(&key)
            .await?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0))
    }

    /// Deletes every window of a client. Administrative only: locates the
    /// windows with a pattern scan.
    pub async fn reset(&self, client: &str) -> Result<u64, StoreError> {
        let keys = self
            .store
            .keys_matching(&CacheKey::rate_limit_windows(client))
            .await?;
        let removed = self.store.delete_many(&keys).await?;

        record_reset();
        info!(client = %client, removed = removed, "Rate limit reset");
        Ok(removed)
    }
}

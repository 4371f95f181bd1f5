//! Rate limiter metrics.

use metrics::counter;

/// Outcome of one limiter decision, used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    Admitted,
    Limited,
    Degraded,
}

impl DecisionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::Limited => "limited",
            Self::Degraded => "degraded",
        }
    }
}

/// Registra las metricas del rate limiter.
pub fn register_rate_limit_metrics() {
    metrics::describe_counter!(
        "kestrel_rate_limit_decisions_total",
        "Rate limiter decisions by policy and outcome"
    );
    metrics::describe_counter!(
        "kestrel_rate_limit_resets_total",
        "Administrative rate limit resets"
    );
}

/// Records a decision for the named policy.
pub fn record_decision(policy: &'static str, outcome: DecisionOutcome) {
    counter!(
        "kestrel_rate_limit_decisions_total",
        "policy" => policy,
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Records an administrative reset.
pub fn record_reset() {
    counter!("kestrel_rate_limit_resets_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(DecisionOutcome::Admitted.as_str(), "admitted");
        assert_eq!(DecisionOutcome::Limited.as_str(), "limited");
        assert_eq!(DecisionOutcome::Degraded.as_str(), "degraded");
    }
}

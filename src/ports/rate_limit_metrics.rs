//! Observability hook for rate limiting outcomes.
//!
//! Fail-open paths must be visible to operators, so the decision surface
//! reports every outcome through this port in addition to logging.

use crate::domain::rate_limit::Decision;

use super::StoreError;

/// Port for recording rate limiting outcomes.
pub trait RateLimitMetrics: Send + Sync {
    /// Record a decision for `endpoint`.
    fn record_decision(&self, endpoint: &str, decision: &Decision);

    /// Record a store failure that caused a fail-open decision.
    fn record_store_failure(&self, endpoint: &str, error: &StoreError);

    /// Record a missing policy that caused a fail-open decision.
    fn record_policy_missing(&self, endpoint: &str);
}

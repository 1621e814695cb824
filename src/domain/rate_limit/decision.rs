//! The normalized verdict returned to callers.

use serde::Serialize;
use std::time::Duration;

use crate::domain::foundation::Timestamp;

use super::Policy;

/// Why a decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// A limiter evaluated the request against the store.
    Enforced,
    /// Administrative identity; no store access happened.
    AdminBypass,
    /// The store or policy lookup failed and the request was let through.
    FailOpen,
}

/// Allow/deny verdict with quota metadata.
///
/// Identical shape for every algorithm so callers can attach rate limit
/// headers uniformly. A denial is an ordinary value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: Timestamp,
    /// Zero when allowed.
    pub retry_after_secs: u32,
    pub source: DecisionSource,
}

impl Decision {
    /// An enforced allow.
    pub fn allowed(policy: &Policy, remaining: u32, reset_at: Timestamp) -> Self {
        Self {
            allowed: true,
            limit: policy.limit(),
            remaining: remaining.min(policy.limit()),
            reset_at,
            retry_after_secs: 0,
            source: DecisionSource::Enforced,
        }
    }

    /// An enforced denial; the client may retry once `reset_at` passes.
    pub fn denied(policy: &Policy, now: Timestamp, reset_at: Timestamp) -> Self {
        Self {
            allowed: false,
            limit: policy.limit(),
            remaining: 0,
            reset_at,
            retry_after_secs: retry_after_secs(now.until(&reset_at)),
            source: DecisionSource::Enforced,
        }
    }

    /// Administrative bypass.
    pub fn bypass(now: Timestamp) -> Self {
        Self {
            allowed: true,
            limit: u32::MAX,
            remaining: u32::MAX,
            reset_at: now,
            retry_after_secs: 0,
            source: DecisionSource::AdminBypass,
        }
    }

    /// Fail-open allow. `policy` is `None` when resolution itself failed.
    pub fn fail_open(policy: Option<&Policy>, now: Timestamp) -> Self {
        let limit = policy.map(Policy::limit).unwrap_or(0);
        Self {
            allowed: true,
            limit,
            remaining: limit,
            reset_at: policy.map(|p| now.plus(p.window())).unwrap_or(now),
            retry_after_secs: 0,
            source: DecisionSource::FailOpen,
        }
    }

    pub fn is_enforced(&self) -> bool {
        self.source == DecisionSource::Enforced
    }
}

/// Whole seconds to wait, rounded up, never less than one.
pub fn retry_after_secs(wait: Duration) -> u32 {
    let millis = wait.as_millis();
    let secs = (millis + 999) / 1000;
    u32::try_from(secs).unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> Policy {
        Policy::new(3, 60).unwrap()
    }

    #[test]
    fn retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(59_000)), 59);
        assert_eq!(retry_after_secs(Duration::from_millis(59_001)), 60);
    }

    #[test]
    fn retry_after_is_at_least_one_second() {
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(10)), 1);
    }

    #[test]
    fn denied_computes_retry_after_from_reset() {
        let now = Timestamp::from_unix_millis(1_000);
        let reset = Timestamp::from_unix_millis(60_000);
        let decision = Decision::denied(&policy(), now, reset);

        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.retry_after_secs, 59);
    }

    #[test]
    fn allowed_clamps_remaining_to_limit() {
        let decision = Decision::allowed(&policy(), 99, Timestamp::from_unix_millis(0));
        assert_eq!(decision.remaining, 3);
        assert!(decision.is_enforced());
    }

    #[test]
    fn fail_open_without_policy_reports_zero_limit() {
        let decision = Decision::fail_open(None, Timestamp::from_unix_millis(0));
        assert!(decision.allowed);
        assert_eq!(decision.limit, 0);
        assert_eq!(decision.source, DecisionSource::FailOpen);
    }

    #[test]
    fn bypass_is_not_enforced() {
        let decision = Decision::bypass(Timestamp::from_unix_millis(0));
        assert!(decision.allowed);
        assert!(!decision.is_enforced());
    }
}

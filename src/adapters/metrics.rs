//! In-process counters for rate limiting outcomes.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::rate_limit::{Decision, DecisionSource};
use crate::ports::{RateLimitMetrics, StoreError};

/// Lock-free counters implementing the `RateLimitMetrics` port.
#[derive(Debug, Default)]
pub struct AtomicRateLimitMetrics {
    allowed: AtomicU64,
    denied: AtomicU64,
    bypassed: AtomicU64,
    failed_open: AtomicU64,
    store_unavailable: AtomicU64,
    store_timeouts: AtomicU64,
    policy_missing: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub allowed: u64,
    pub denied: u64,
    pub bypassed: u64,
    pub failed_open: u64,
    pub store_unavailable: u64,
    pub store_timeouts: u64,
    pub policy_missing: u64,
}

impl AtomicRateLimitMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            allowed: self.allowed.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            failed_open: self.failed_open.load(Ordering::Relaxed),
            store_unavailable: self.store_unavailable.load(Ordering::Relaxed),
            store_timeouts: self.store_timeouts.load(Ordering::Relaxed),
            policy_missing: self.policy_missing.load(Ordering::Relaxed),
        }
    }
}

impl RateLimitMetrics for AtomicRateLimitMetrics {
    fn record_decision(&self, _endpoint: &str, decision: &Decision) {
        let counter = match (decision.source, decision.allowed) {
            (DecisionSource::AdminBypass, _) => &self.bypassed,
            (DecisionSource::FailOpen, _) => &self.failed_open,
            (DecisionSource::Enforced, true) => &self.allowed,
            (DecisionSource::Enforced, false) => &self.denied,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_store_failure(&self, _endpoint: &str, error: &StoreError) {
        let counter = match error {
            StoreError::Unavailable(_) => &self.store_unavailable,
            StoreError::Timeout(_) => &self.store_timeouts,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_policy_missing(&self, _endpoint: &str) {
        self.policy_missing.fetch_add(1, Ordering::Relaxed);
    }
}

//! Sliding-window log limiter.
//!
//! Keeps one timestamped entry per admitted request and counts the entries
//! inside the trailing window. Precise and burst-free at the cost of
//! O(log n) store work per request; preferred for expensive endpoints.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::Timestamp;
use crate::domain::rate_limit::{Decision, Policy, RateLimitKey};
use crate::ports::{CounterStore, StoreError};

use super::WindowLimiter;

pub struct SlidingWindowLimiter {
    store: Arc<dyn CounterStore>,
}

impl SlidingWindowLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// When the earliest surviving entry leaves the window.
    async fn reset_at(&self, key: &RateLimitKey, policy: &Policy, now: Timestamp) -> Result<Timestamp, StoreError> {
        let oldest = self.store.oldest_entry(key.as_str()).await?;
        Ok(oldest.unwrap_or(now).plus(policy.window()))
    }
}

#[async_trait]
impl WindowLimiter for SlidingWindowLimiter {
    async fn acquire(
        &self,
        key: &RateLimitKey,
        policy: &Policy,
        now: Timestamp,
    ) -> Result<Decision, StoreError> {
        let cutoff = now.minus(policy.window());
        let limit = u64::from(policy.limit());
        let count = self
            .store
            .admit_entry(key.as_str(), now, cutoff, limit, policy.window())
            .await?;

        // Denied attempts are not recorded and do not consume quota.
        if count >= limit {
            let reset_at = self.reset_at(key, policy, now).await?;
            return Ok(Decision::denied(policy, now, reset_at));
        }

        let reset_at = if count == 0 {
            now.plus(policy.window())
        } else {
            self.reset_at(key, policy, now).await?
        };

        let remaining = (limit - count - 1) as u32;
        Ok(Decision::allowed(policy, remaining, reset_at))
    }

    async fn peek(
        &self,
        key: &RateLimitKey,
        policy: &Policy,
        now: Timestamp,
    ) -> Result<Decision, StoreError> {
        // Pruning only drops entries that no longer count, so it is safe here.
        let cutoff = now.minus(policy.window());
        let count = self.store.prune_and_count(key.as_str(), cutoff).await?;
        let reset_at = self.reset_at(key, policy, now).await?;

        let limit = u64::from(policy.limit());
        if count >= limit {
            return Ok(Decision::denied(policy, now, reset_at));
        }
        Ok(Decision::allowed(policy, (limit - count) as u32, reset_at))
    }
}

//! Fixed-window counter limiter.
//!
//! One atomic increment per request against a counter whose TTL is set by
//! the first hit of each window. Bursts of up to twice the limit across a
//! window boundary are an accepted property of the algorithm.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::Timestamp;
use crate::domain::rate_limit::{Decision, Policy, RateLimitKey};
use crate::ports::{CounterStore, StoreError};

use super::WindowLimiter;

pub struct FixedWindowLimiter {
    store: Arc<dyn CounterStore>,
}

impl FixedWindowLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    async fn reset_at(&self, key: &RateLimitKey, policy: &Policy, now: Timestamp) -> Result<Timestamp, StoreError> {
        let ttl = self.store.ttl(key.as_str()).await?;
        Ok(now.plus(ttl.remaining().unwrap_or(policy.window())))
    }
}

#[async_trait]
impl WindowLimiter for FixedWindowLimiter {
    async fn acquire(
        &self,
        key: &RateLimitKey,
        policy: &Policy,
        now: Timestamp,
    ) -> Result<Decision, StoreError> {
        let count = self
            .store
            .increment_and_expire(key.as_str(), policy.window())
            .await?;
        let reset_at = self.reset_at(key, policy, now).await?;

        // count == limit is the last allowed request.
        let limit = u64::from(policy.limit());
        if count > limit {
            return Ok(Decision::denied(policy, now, reset_at));
        }

        let remaining = (limit - count) as u32;
        Ok(Decision::allowed(policy, remaining, reset_at))
    }

    async fn peek(
        &self,
        key: &RateLimitKey,
        policy: &Policy,
        now: Timestamp,
    ) -> Result<Decision, StoreError> {
        let count = self.store.current_count(key.as_str()).await?;
        let reset_at = self.reset_at(key, policy, now).await?;

        let limit = u64::from(policy.limit());
        if count >= limit {
            return Ok(Decision::denied(policy, now, reset_at));
        }
        Ok(Decision::allowed(policy, (limit - count) as u32, reset_at))
    }
}

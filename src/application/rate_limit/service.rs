//! Decision surface: the single entry point callers use.

use std::sync::Arc;
use thiserror::Error;

use crate::config::RateLimitConfig;
use crate::domain::foundation::Timestamp;
use crate::domain::rate_limit::{Algorithm, Decision, EffectivePolicy, Identity, RateLimitKey};
use crate::ports::{Clock, CounterStore, RateLimitMetrics, StoreError};

use super::{FixedWindowLimiter, PolicyError, PolicyResolver, SlidingWindowLimiter, WindowLimiter};

/// Errors from the administrative operations.
///
/// `check` never fails; it folds these into fail-open decisions instead.
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("counter store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Orchestrates policy resolution, the limiters and the counter store.
///
/// Holds no per-request state; safe to share behind an `Arc` across tasks.
pub struct RateLimitService {
    resolver: PolicyResolver,
    fixed: FixedWindowLimiter,
    sliding: SlidingWindowLimiter,
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn RateLimitMetrics>,
}

impl RateLimitService {
    pub fn new(
        config: RateLimitConfig,
        store: Arc<dyn CounterStore>,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn RateLimitMetrics>,
    ) -> Self {
        Self {
            resolver: PolicyResolver::new(config),
            fixed: FixedWindowLimiter::new(store.clone()),
            sliding: SlidingWindowLimiter::new(store.clone()),
            store,
            clock,
            metrics,
        }
    }

    /// Checks and consumes quota using the endpoint's configured algorithm.
    pub async fn check(&self, identity: &Identity, endpoint: &str) -> Decision {
        let algorithm = self.resolver.algorithm_for(endpoint);
        self.check_with(identity, endpoint, algorithm).await
    }

    /// Checks and consumes quota with an explicit algorithm.
    pub async fn check_with(&self, identity: &Identity, endpoint: &str, algorithm: Algorithm) -> Decision {
        let now = self.clock.now();
        let decision = self.evaluate(identity, endpoint, algorithm, now).await;
        self.metrics.record_decision(endpoint, &decision);

        if !decision.allowed {
            tracing::info!(
                endpoint,
                principal = %identity.principal(),
                limit = decision.limit,
                retry_after_secs = decision.retry_after_secs,
                "Rate limit exceeded"
            );
        }
        decision
    }

    async fn evaluate(
        &self,
        identity: &Identity,
        endpoint: &str,
        algorithm: Algorithm,
        now: Timestamp,
    ) -> Decision {
        let policy = match self.resolver.resolve(identity, endpoint) {
            Ok(EffectivePolicy::Unlimited) => {
                tracing::debug!(endpoint, principal = %identity.principal(), "Admin bypass");
                return Decision::bypass(now);
            }
            Ok(EffectivePolicy::Limited(policy)) => policy,
            Err(error) => {
                tracing::error!(endpoint, error = %error, "Rate limit policy missing, failing open");
                self.metrics.record_policy_missing(endpoint);
                return Decision::fail_open(None, now);
            }
        };

        let key = RateLimitKey::new(identity, endpoint, algorithm);
        let result = self.limiter(algorithm).acquire(&key, &policy, now).await;

        match result {
            Ok(decision) => decision,
            Err(error) => {
                tracing::warn!(
                    endpoint,
                    algorithm = algorithm.key_tag(),
                    error = %error,
                    "Counter store unavailable, failing open"
                );
                self.metrics.record_store_failure(endpoint, &error);
                Decision::fail_open(Some(&policy), now)
            }
        }
    }

    /// Current quota for the endpoint's configured algorithm, without consuming.
    pub async fn status(&self, identity: &Identity, endpoint: &str) -> Result<Decision, RateLimitError> {
        let now = self.clock.now();
        let policy = match self.resolver.resolve(identity, endpoint)? {
            EffectivePolicy::Unlimited => return Ok(Decision::bypass(now)),
            EffectivePolicy::Limited(policy) => policy,
        };

        let algorithm = self.resolver.algorithm_for(endpoint);
        let key = RateLimitKey::new(identity, endpoint, algorithm);
        Ok(self.limiter(algorithm).peek(&key, &policy, now).await?)
    }

    /// Clears all counters for the identity on `endpoint`.
    pub async fn reset(&self, identity: &Identity, endpoint: &str) -> Result<(), RateLimitError> {
        for algorithm in [Algorithm::FixedWindow, Algorithm::SlidingWindow] {
            let key = RateLimitKey::new(identity, endpoint, algorithm);
            self.store.remove(key.as_str()).await?;
        }
        tracing::info!(endpoint, principal = %identity.principal(), "Rate limit reset");
        Ok(())
    }

    fn limiter(&self, algorithm: Algorithm) -> &dyn WindowLimiter {
        match algorithm {
            Algorithm::FixedWindow => &self.fixed,
            Algorithm::SlidingWindow => &self.sliding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::counter_store::InMemoryCounterStore;
    use crate::adapters::metrics::AtomicRateLimitMetrics;
    use crate::domain::foundation::UserId;
    use crate::domain::rate_limit::{DecisionSource, ServiceTier};
    use std::net::{IpAddr, Ipv4Addr};

    struct Harness {
        service: RateLimitService,
        store: Arc<InMemoryCounterStore>,
        metrics: Arc<AtomicRateLimitMetrics>,
    }

    fn harness(config: RateLimitConfig) -> Harness {
        let clock = Arc::new(ManualClock::at_millis(1_000_000));
        let store = Arc::new(InMemoryCounterStore::new(clock.clone()));
        let metrics = Arc::new(AtomicRateLimitMetrics::new());
        let service = RateLimitService::new(config, store.clone(), clock, metrics.clone());
        Harness {
            service,
            store,
            metrics,
        }
    }

    fn free_user() -> Identity {
        Identity::user(UserId::new("user-1").unwrap(), Some(ServiceTier::Free))
    }

    #[tokio::test]
    async fn check_uses_tier_limit() {
        let h = harness(RateLimitConfig::default());

        let decision = h.service.check(&free_user(), "list_sessions").await;

        assert!(decision.allowed);
        assert_eq!(decision.limit, 10);
        assert_eq!(decision.remaining, 9);
        assert_eq!(decision.source, DecisionSource::Enforced);
    }

    #[tokio::test]
    async fn admin_bypass_never_touches_store() {
        let h = harness(RateLimitConfig::default());
        let admin = free_user().with_admin(true);

        for _ in 0..50 {
            let decision = h.service.check(&admin, "ai_generate").await;
            assert!(decision.allowed);
            assert_eq!(decision.source, DecisionSource::AdminBypass);
        }

        assert!(h.store.is_empty().await);
        assert_eq!(h.metrics.snapshot().bypassed, 50);
    }

    #[tokio::test]
    async fn missing_policy_fails_open() {
        let config = RateLimitConfig {
            default_policy: None,
            ..RateLimitConfig::default()
        };
        let h = harness(config);
        let anonymous = Identity::anonymous(IpAddr::V4(Ipv4Addr::LOCALHOST));

        let decision = h.service.check(&anonymous, "list_sessions").await;

        assert!(decision.allowed);
        assert_eq!(decision.source, DecisionSource::FailOpen);
        assert_eq!(h.metrics.snapshot().policy_missing, 1);
    }

    #[tokio::test]
    async fn status_does_not_consume_quota() {
        let h = harness(RateLimitConfig::default());
        let user = free_user();

        h.service.check(&user, "ai_generate").await;
        let first = h.service.status(&user, "ai_generate").await.unwrap();
        let second = h.service.status(&user, "ai_generate").await.unwrap();

        assert_eq!(first.remaining, 4);
        assert_eq!(second.remaining, 4);
    }

    #[tokio::test]
    async fn reset_clears_both_algorithms() {
        let h = harness(RateLimitConfig::default());
        let user = free_user();

        h.service.check_with(&user, "api", Algorithm::FixedWindow).await;
        h.service.check_with(&user, "api", Algorithm::SlidingWindow).await;
        assert_eq!(h.store.len().await, 2);

        h.service.reset(&user, "api").await.unwrap();
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn status_without_policy_is_an_error() {
        let config = RateLimitConfig {
            default_policy: None,
            ..RateLimitConfig::default()
        };
        let h = harness(config);
        let anonymous = Identity::anonymous(IpAddr::V4(Ipv4Addr::LOCALHOST));

        let result = h.service.status(&anonymous, "api").await;
        assert!(matches!(result, Err(RateLimitError::Policy(PolicyError::NotFound { .. }))));
    }
}

//! End-to-end behaviour of the decision surface over the in-memory store.
//!
//! Time is driven by a manual clock so window arithmetic is exact.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tiergate::adapters::{AtomicRateLimitMetrics, InMemoryCounterStore, ManualClock, TimeoutCounterStore};
use tiergate::application::RateLimitService;
use tiergate::config::{EndpointRule, RateLimitConfig};
use tiergate::domain::foundation::{Timestamp, UserId};
use tiergate::domain::rate_limit::{Algorithm, DecisionSource, Identity, ServiceTier};
use tiergate::ports::{Clock, CounterStore, KeyTtl, StoreError};

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Store whose every call fails as if Redis were down.
struct FailingStore;

#[async_trait]
impl CounterStore for FailingStore {
    async fn increment_and_expire(&self, _key: &str, _window: Duration) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn ttl(&self, _key: &str) -> Result<KeyTtl, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn add_timestamped_entry(
        &self,
        _key: &str,
        _timestamp: Timestamp,
        _window: Duration,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn prune_and_count(&self, _key: &str, _cutoff: Timestamp) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn oldest_entry(&self, _key: &str) -> Result<Option<Timestamp>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn current_count(&self, _key: &str) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// Store that never answers.
struct StalledStore;

#[async_trait]
impl CounterStore for StalledStore {
    async fn increment_and_expire(&self, _key: &str, _window: Duration) -> Result<u64, StoreError> {
        std::future::pending().await
    }

    async fn ttl(&self, _key: &str) -> Result<KeyTtl, StoreError> {
        std::future::pending().await
    }

    async fn add_timestamped_entry(
        &self,
        _key: &str,
        _timestamp: Timestamp,
        _window: Duration,
    ) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn prune_and_count(&self, _key: &str, _cutoff: Timestamp) -> Result<u64, StoreError> {
        std::future::pending().await
    }

    async fn oldest_entry(&self, _key: &str) -> Result<Option<Timestamp>, StoreError> {
        std::future::pending().await
    }

    async fn current_count(&self, _key: &str) -> Result<u64, StoreError> {
        std::future::pending().await
    }

    async fn remove(&self, _key: &str) -> Result<(), StoreError> {
        std::future::pending().await
    }
}

/// Delegating store that counts every call.
struct CountingStore {
    inner: InMemoryCounterStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: InMemoryCounterStore::new(clock),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CounterStore for CountingStore {
    async fn increment_and_expire(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        self.tick();
        self.inner.increment_and_expire(key, window).await
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        self.tick();
        self.inner.ttl(key).await
    }

    async fn add_timestamped_entry(
        &self,
        key: &str,
        timestamp: Timestamp,
        window: Duration,
    ) -> Result<(), StoreError> {
        self.tick();
        self.inner.add_timestamped_entry(key, timestamp, window).await
    }

    async fn prune_and_count(&self, key: &str, cutoff: Timestamp) -> Result<u64, StoreError> {
        self.tick();
        self.inner.prune_and_count(key, cutoff).await
    }

    async fn oldest_entry(&self, key: &str) -> Result<Option<Timestamp>, StoreError> {
        self.tick();
        self.inner.oldest_entry(key).await
    }

    async fn current_count(&self, key: &str) -> Result<u64, StoreError> {
        self.tick();
        self.inner.current_count(key).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.tick();
        self.inner.remove(key).await
    }
}

fn config_with(endpoint: &str, limit: u32, window_secs: u32, algorithm: Algorithm) -> RateLimitConfig {
    let mut endpoints = HashMap::new();
    endpoints.insert(
        endpoint.to_string(),
        EndpointRule {
            limit: Some(limit),
            window_secs: Some(window_secs),
            algorithm: Some(algorithm),
            ..EndpointRule::default()
        },
    );
    RateLimitConfig {
        endpoints,
        ..RateLimitConfig::default()
    }
}

fn service_with(
    config: RateLimitConfig,
    store: Arc<dyn CounterStore>,
    clock: Arc<ManualClock>,
) -> (RateLimitService, Arc<AtomicRateLimitMetrics>) {
    let metrics = Arc::new(AtomicRateLimitMetrics::new());
    let service = RateLimitService::new(config, store, clock, metrics.clone());
    (service, metrics)
}

fn in_memory(config: RateLimitConfig) -> (RateLimitService, Arc<ManualClock>, Arc<AtomicRateLimitMetrics>) {
    let clock = Arc::new(ManualClock::at_millis(0));
    let store = Arc::new(InMemoryCounterStore::new(clock.clone()));
    let (service, metrics) = service_with(config, store, clock.clone());
    (service, clock, metrics)
}

fn user(id: &str, tier: Option<ServiceTier>) -> Identity {
    Identity::user(UserId::new(id).unwrap(), tier)
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn fixed_window_three_per_minute() {
    let (service, clock, _) = in_memory(config_with("api", 3, 60, Algorithm::FixedWindow));
    let alice = user("alice", Some(ServiceTier::Free));

    for expected in [2, 1, 0] {
        let decision = service.check(&alice, "api").await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, expected);
    }

    clock.set(Timestamp::from_unix_millis(1_000));
    let denied = service.check(&alice, "api").await;
    assert!(!denied.allowed);
    assert_eq!(denied.retry_after_secs, 59);

    clock.set(Timestamp::from_unix_millis(61_000));
    let fresh = service.check(&alice, "api").await;
    assert!(fresh.allowed);
    assert_eq!(fresh.remaining, 2);
}

#[tokio::test]
async fn sliding_window_two_per_ten_seconds() {
    let (service, clock, _) = in_memory(config_with("ai_generate", 2, 10, Algorithm::SlidingWindow));
    let bob = user("bob", Some(ServiceTier::Standard));

    assert!(service.check(&bob, "ai_generate").await.allowed);

    clock.set(Timestamp::from_unix_millis(5_000));
    assert!(service.check(&bob, "ai_generate").await.allowed);

    clock.set(Timestamp::from_unix_millis(8_000));
    let denied = service.check(&bob, "ai_generate").await;
    assert!(!denied.allowed);
    assert_eq!(denied.retry_after_secs, 2);

    // The t=0 entry has aged out; only t=5 remains.
    clock.set(Timestamp::from_unix_millis(11_000));
    let allowed = service.check(&bob, "ai_generate").await;
    assert!(allowed.allowed);
    assert_eq!(allowed.remaining, 0);
}

#[tokio::test]
async fn sliding_window_admits_evenly_spaced_requests() {
    let (service, clock, metrics) = in_memory(config_with("api", 4, 10, Algorithm::SlidingWindow));
    let paula = user("paula", None);

    // Every 2.5s for two windows: never more than 4 inside any trailing 10s.
    for step in 0..=8 {
        clock.set(Timestamp::from_unix_millis(step * 2_500));
        let decision = service.check(&paula, "api").await;
        assert!(decision.allowed, "request at {}ms was denied", step * 2_500);
    }

    assert_eq!(metrics.snapshot().denied, 0);
}

#[tokio::test]
async fn sliding_window_retry_after_is_honoured_exactly() {
    let (service, clock, _) = in_memory(config_with("ai_generate", 2, 10, Algorithm::SlidingWindow));
    let quinn = user("quinn", None);

    service.check(&quinn, "ai_generate").await;
    clock.set(Timestamp::from_unix_millis(5_000));
    service.check(&quinn, "ai_generate").await;

    clock.set(Timestamp::from_unix_millis(8_000));
    let denied = service.check(&quinn, "ai_generate").await;
    assert!(!denied.allowed);
    assert_eq!(denied.reset_at.as_unix_millis(), 10_000);

    clock.set(Timestamp::from_unix_millis(8_000 + i64::from(denied.retry_after_secs) * 1_000));
    assert!(service.check(&quinn, "ai_generate").await.allowed);
}

#[tokio::test]
async fn sliding_window_has_no_boundary_burst() {
    let (service, clock, _) = in_memory(config_with("api", 4, 10, Algorithm::SlidingWindow));
    let carol = user("carol", None);

    // Fill the quota late in one fixed-window period...
    clock.set(Timestamp::from_unix_millis(9_000));
    for _ in 0..4 {
        assert!(service.check(&carol, "api").await.allowed);
    }

    // ...and the trailing window still holds it just after the boundary.
    clock.set(Timestamp::from_unix_millis(10_500));
    assert!(!service.check(&carol, "api").await.allowed);
}

#[tokio::test]
async fn fixed_window_permits_boundary_burst() {
    let (service, clock, _) = in_memory(config_with("api", 4, 10, Algorithm::FixedWindow));
    let dave = user("dave", None);

    clock.set(Timestamp::from_unix_millis(0));
    assert!(service.check(&dave, "api").await.allowed);

    clock.set(Timestamp::from_unix_millis(9_000));
    for _ in 0..3 {
        assert!(service.check(&dave, "api").await.allowed);
    }

    clock.set(Timestamp::from_unix_millis(10_000));
    for _ in 0..4 {
        assert!(service.check(&dave, "api").await.allowed);
    }
}

#[tokio::test]
async fn tiers_get_their_default_limits() {
    let (service, _, _) = in_memory(RateLimitConfig::default());

    let free = service.check(&user("f", Some(ServiceTier::Free)), "list").await;
    let standard = service.check(&user("s", Some(ServiceTier::Standard)), "list").await;
    let premium = service.check(&user("p", Some(ServiceTier::Premium)), "list").await;
    let anonymous = service
        .check(&Identity::anonymous(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9))), "list")
        .await;

    assert_eq!(free.limit, 10);
    assert_eq!(standard.limit, 60);
    assert_eq!(premium.limit, 300);
    assert_eq!(anonymous.limit, 10);
}

#[tokio::test]
async fn identities_and_endpoints_are_isolated() {
    let (service, _, _) = in_memory(config_with("api", 1, 60, Algorithm::FixedWindow));
    let erin = user("erin", None);
    let frank = user("frank", None);

    assert!(service.check(&erin, "api").await.allowed);
    assert!(!service.check(&erin, "api").await.allowed);

    assert!(service.check(&frank, "api").await.allowed);
    assert!(service.check(&erin, "other").await.allowed);
}

#[tokio::test]
async fn explicit_algorithm_uses_separate_counters() {
    let (service, _, _) = in_memory(config_with("api", 1, 60, Algorithm::FixedWindow));
    let grace = user("grace", None);

    assert!(service.check_with(&grace, "api", Algorithm::FixedWindow).await.allowed);
    assert!(service.check_with(&grace, "api", Algorithm::SlidingWindow).await.allowed);
    assert!(!service.check_with(&grace, "api", Algorithm::FixedWindow).await.allowed);
}

// =============================================================================
// Failure Handling
// =============================================================================

#[tokio::test]
async fn store_outage_fails_open_and_is_counted() {
    let clock = Arc::new(ManualClock::at_millis(0));
    let (service, metrics) = service_with(
        config_with("api", 1, 60, Algorithm::FixedWindow),
        Arc::new(FailingStore),
        clock,
    );
    let heidi = user("heidi", None);

    for _ in 0..5 {
        let decision = service.check(&heidi, "api").await;
        assert!(decision.allowed);
        assert_eq!(decision.source, DecisionSource::FailOpen);
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.failed_open, 5);
    assert_eq!(snapshot.store_unavailable, 5);
    assert_eq!(snapshot.allowed, 0);
}

#[tokio::test]
async fn slow_store_times_out_and_fails_open() {
    let clock = Arc::new(ManualClock::at_millis(0));
    let store = Arc::new(TimeoutCounterStore::new(
        Arc::new(StalledStore),
        Duration::from_millis(20),
    ));
    let (service, metrics) = service_with(
        config_with("ai_generate", 5, 60, Algorithm::SlidingWindow),
        store,
        clock,
    );

    let decision = service.check(&user("ivan", None), "ai_generate").await;

    assert!(decision.allowed);
    assert_eq!(decision.source, DecisionSource::FailOpen);
    assert_eq!(metrics.snapshot().store_timeouts, 1);
}

#[tokio::test]
async fn admin_bypass_performs_no_store_calls() {
    let clock = Arc::new(ManualClock::at_millis(0));
    let store = Arc::new(CountingStore::new(clock.clone()));
    let (service, _) = service_with(
        config_with("api", 1, 60, Algorithm::SlidingWindow),
        store.clone(),
        clock,
    );
    let admin = user("root", Some(ServiceTier::Free)).with_admin(true);

    for _ in 0..10 {
        let decision = service.check(&admin, "api").await;
        assert!(decision.allowed);
        assert_eq!(decision.source, DecisionSource::AdminBypass);
    }

    assert_eq!(store.calls(), 0);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_fixed_window_checks_never_exceed_limit() {
    let (service, _, metrics) = in_memory(config_with("api", 10, 60, Algorithm::FixedWindow));
    let service = Arc::new(service);
    let judy = user("judy", None);

    let tasks = (0..40).map(|_| {
        let service = service.clone();
        let judy = judy.clone();
        tokio::spawn(async move { service.check(&judy, "api").await })
    });
    let decisions = futures::future::join_all(tasks).await;

    let allowed = decisions
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(|decision| decision.allowed)
        .count();
    assert_eq!(allowed, 10);
    assert_eq!(metrics.snapshot().denied, 30);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sliding_window_checks_never_exceed_limit() {
    let (service, _, metrics) = in_memory(config_with("ai_generate", 10, 60, Algorithm::SlidingWindow));
    let service = Arc::new(service);
    let kim = user("kim", None);

    let tasks = (0..40).map(|_| {
        let service = service.clone();
        let kim = kim.clone();
        tokio::spawn(async move { service.check(&kim, "ai_generate").await })
    });
    let decisions = futures::future::join_all(tasks).await;

    let allowed = decisions
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(|decision| decision.allowed)
        .count();
    assert_eq!(allowed, 10);
    assert_eq!(metrics.snapshot().denied, 30);
}

// =============================================================================
// Status and Reset
// =============================================================================

#[tokio::test]
async fn reset_restores_full_quota() {
    let (service, _, _) = in_memory(config_with("api", 2, 60, Algorithm::SlidingWindow));
    let mallory = user("mallory", None);

    service.check(&mallory, "api").await;
    service.check(&mallory, "api").await;
    assert!(!service.check(&mallory, "api").await.allowed);

    service.reset(&mallory, "api").await.unwrap();

    let status = service.status(&mallory, "api").await.unwrap();
    assert_eq!(status.remaining, 2);
    assert!(service.check(&mallory, "api").await.allowed);
}

//! Per-call timeout decorator for any counter store.
//!
//! A store call that exceeds the deadline becomes `StoreError::Timeout`
//! instead of stalling the request, which the decision surface then turns
//! into a fail-open decision.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::Timestamp;
use crate::ports::{CounterStore, KeyTtl, StoreError};

/// Wraps a counter store, bounding every call by `timeout`.
pub struct TimeoutCounterStore {
    inner: Arc<dyn CounterStore>,
    timeout: Duration,
}

impl TimeoutCounterStore {
    pub fn new(inner: Arc<dyn CounterStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl CounterStore for TimeoutCounterStore {
    async fn increment_and_expire(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        self.bounded(self.inner.increment_and_expire(key, window))
            .await
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        self.bounded(self.inner.ttl(key)).await
    }

    async fn add_timestamped_entry(
        &self,
        key: &str,
        timestamp: Timestamp,
        window: Duration,
    ) -> Result<(), StoreError> {
        self.bounded(self.inner.add_timestamped_entry(key, timestamp, window))
            .await
    }

    async fn prune_and_count(&self, key: &str, cutoff: Timestamp) -> Result<u64, StoreError> {
        self.bounded(self.inner.prune_and_count(key, cutoff)).await
    }

    async fn admit_entry(
        &self,
        key: &str,
        timestamp: Timestamp,
        cutoff: Timestamp,
        limit: u64,
        window: Duration,
    ) -> Result<u64, StoreError> {
        self.bounded(self.inner.admit_entry(key, timestamp, cutoff, limit, window))
            .await
    }

    async fn oldest_entry(&self, key: &str) -> Result<Option<Timestamp>, StoreError> {
        self.bounded(self.inner.oldest_entry(key)).await
    }

    async fn current_count(&self, key: &str) -> Result<u64, StoreError> {
        self.bounded(self.inner.current_count(key)).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.bounded(self.inner.remove(key)).await
    }
}

impl std::fmt::Debug for TimeoutCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutCounterStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

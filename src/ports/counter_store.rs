//! Counter store port for shared rate limit state.
//!
//! This port defines the atomic primitives both limiter algorithms need.
//! Any store that can provide them (Redis in production, an in-memory map
//! for tests) is substitutable. Every method is a potential network round
//! trip and must be safe under concurrent use from independent processes.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::Timestamp;

/// Port for the shared store holding counters and timestamped logs.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter at `key` and return the new value.
    ///
    /// The TTL is set to `window` only when the key has none, so every hit
    /// in a window shares the reset boundary set by the first one.
    async fn increment_and_expire(&self, key: &str, window: Duration) -> Result<u64, StoreError>;

    /// Remaining time until `key` expires.
    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError>;

    /// Insert a uniquely identified entry scored by `timestamp` and refresh
    /// the set's own expiry to slightly more than `window`.
    async fn add_timestamped_entry(
        &self,
        key: &str,
        timestamp: Timestamp,
        window: Duration,
    ) -> Result<(), StoreError>;

    /// Atomically drop entries scored at or below `cutoff` and return how
    /// many remain.
    ///
    /// An entry exactly one window old no longer counts, so a client that
    /// waits until `oldest + window` is admitted.
    async fn prune_and_count(&self, key: &str, cutoff: Timestamp) -> Result<u64, StoreError>;

    /// Prune at `cutoff`, count, and record an entry at `timestamp` only if
    /// the count is below `limit`. Returns the count before recording.
    ///
    /// The default composes `prune_and_count` and `add_timestamped_entry`,
    /// which lets concurrent callers race between the two calls. Stores
    /// shared across processes override it with a single atomic unit.
    async fn admit_entry(
        &self,
        key: &str,
        timestamp: Timestamp,
        cutoff: Timestamp,
        limit: u64,
        window: Duration,
    ) -> Result<u64, StoreError> {
        let count = self.prune_and_count(key, cutoff).await?;
        if count < limit {
            self.add_timestamped_entry(key, timestamp, window).await?;
        }
        Ok(count)
    }

    /// Score of the earliest surviving entry, if any.
    async fn oldest_entry(&self, key: &str) -> Result<Option<Timestamp>, StoreError>;

    /// Current counter value without incrementing. Zero when missing.
    async fn current_count(&self, key: &str) -> Result<u64, StoreError>;

    /// Delete `key` entirely.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Expiry state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key expires after this duration.
    Expires(Duration),
    /// Key exists without an expiry.
    Persistent,
    /// Key does not exist.
    Missing,
}

impl KeyTtl {
    /// Maps a Redis `PTTL` reply (-2 missing, -1 persistent) to a `KeyTtl`.
    pub fn from_pttl(millis: i64) -> Self {
        match millis {
            -2 => KeyTtl::Missing,
            m if m < 0 => KeyTtl::Persistent,
            m => KeyTtl::Expires(Duration::from_millis(m as u64)),
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        match self {
            KeyTtl::Expires(d) => Some(*d),
            _ => None,
        }
    }
}

/// Errors that can occur talking to the counter store.
///
/// Both variants mean the store is unavailable; callers fail open.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Store backend is unreachable or returned an error.
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    /// Store call did not complete within the configured timeout.
    #[error("counter store call timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => "unavailable",
            StoreError::Timeout(_) => "timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pttl_sentinels_map_to_variants() {
        assert_eq!(KeyTtl::from_pttl(-2), KeyTtl::Missing);
        assert_eq!(KeyTtl::from_pttl(-1), KeyTtl::Persistent);
        assert_eq!(
            KeyTtl::from_pttl(1_500),
            KeyTtl::Expires(Duration::from_millis(1_500))
        );
    }

    #[test]
    fn remaining_only_for_expiring_keys() {
        assert_eq!(KeyTtl::Missing.remaining(), None);
        assert_eq!(KeyTtl::Persistent.remaining(), None);
        assert_eq!(
            KeyTtl::Expires(Duration::from_secs(3)).remaining(),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn error_kinds_are_distinct() {
        assert_eq!(StoreError::Unavailable("down".into()).kind(), "unavailable");
        assert_eq!(StoreError::Timeout(Duration::from_millis(5)).kind(), "timeout");
    }

    #[test]
    fn counter_store_is_object_safe() {
        fn assert_object_safe(_: Option<&dyn CounterStore>) {}
        assert_object_safe(None);
    }
}

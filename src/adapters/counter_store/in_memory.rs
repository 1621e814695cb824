//! In-memory counter store for testing and single-server deployments.
//!
//! Emulates the Redis semantics the limiters depend on: TTLs are honoured
//! lazily against the injected clock, and every operation runs under one
//! lock so each primitive is atomic. Not shared across processes.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::foundation::Timestamp;
use crate::ports::{Clock, CounterStore, KeyTtl, StoreError};

use super::ENTRY_TTL_GRACE;

/// In-memory counter store.
pub struct InMemoryCounterStore {
    clock: Arc<dyn Clock>,
    entries: Arc<RwLock<HashMap<String, StoredValue>>>,
}

#[derive(Debug, Clone)]
struct StoredValue {
    data: StoredData,
    expires_at: Option<Timestamp>,
}

#[derive(Debug, Clone)]
enum StoredData {
    Counter(u64),
    /// (score in unix millis, insertion sequence) pairs.
    Log { entries: BTreeSet<(i64, u64)>, next_seq: u64 },
}

impl StoredValue {
    fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| !now.is_before(&at))
    }
}

impl InMemoryCounterStore {
    /// Create an empty store reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of live keys, for tests and diagnostics.
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries.values().filter(|v| !v.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn wrong_type(key: &str) -> StoreError {
        StoreError::Unavailable(format!(
            "WRONGTYPE operation against key '{}' holding the wrong kind of value",
            key
        ))
    }

    /// Drops `key` if its TTL has elapsed.
    fn evict_expired(entries: &mut HashMap<String, StoredValue>, key: &str, now: Timestamp) {
        if entries.get(key).is_some_and(|v| v.is_expired(now)) {
            entries.remove(key);
        }
    }

    /// Drops log entries scored at or below `cutoff`; returns how many remain.
    fn prune_log(
        entries: &mut HashMap<String, StoredValue>,
        key: &str,
        cutoff: Timestamp,
    ) -> Result<u64, StoreError> {
        let cutoff = cutoff.as_unix_millis();

        let remaining = match entries.get_mut(key).map(|v| &mut v.data) {
            None => return Ok(0),
            Some(StoredData::Log { entries: log, .. }) => {
                log.retain(|(score, _)| *score > cutoff);
                log.len() as u64
            }
            Some(StoredData::Counter(_)) => return Err(Self::wrong_type(key)),
        };

        // An emptied sorted set ceases to exist.
        if remaining == 0 {
            entries.remove(key);
        }
        Ok(remaining)
    }

    fn insert_entry(
        entries: &mut HashMap<String, StoredValue>,
        key: &str,
        timestamp: Timestamp,
        expires_at: Timestamp,
    ) -> Result<(), StoreError> {
        let value = entries.entry(key.to_string()).or_insert_with(|| StoredValue {
            data: StoredData::Log {
                entries: BTreeSet::new(),
                next_seq: 0,
            },
            expires_at: None,
        });

        match &mut value.data {
            StoredData::Log { entries, next_seq } => {
                entries.insert((timestamp.as_unix_millis(), *next_seq));
                *next_seq += 1;
            }
            StoredData::Counter(_) => return Err(Self::wrong_type(key)),
        }
        value.expires_at = Some(expires_at);
        Ok(())
    }

    fn peek<'a>(
        entries: &'a HashMap<String, StoredValue>,
        key: &str,
        now: Timestamp,
    ) -> Option<&'a StoredValue> {
        entries.get(key).filter(|v| !v.is_expired(now))
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment_and_expire(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        Self::evict_expired(&mut entries, key, now);
        let value = entries.entry(key.to_string()).or_insert_with(|| StoredValue {
            data: StoredData::Counter(0),
            expires_at: None,
        });

        let count = match &mut value.data {
            StoredData::Counter(count) => {
                *count += 1;
                *count
            }
            StoredData::Log { .. } => return Err(Self::wrong_type(key)),
        };

        if value.expires_at.is_none() {
            value.expires_at = Some(now.plus(window));
        }

        Ok(count)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let now = self.clock.now();
        let entries = self.entries.read().await;

        Ok(match Self::peek(&entries, key, now) {
            None => KeyTtl::Missing,
            Some(StoredValue {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(StoredValue {
                expires_at: Some(at),
                ..
            }) => KeyTtl::Expires(now.until(at)),
        })
    }

    async fn add_timestamped_entry(
        &self,
        key: &str,
        timestamp: Timestamp,
        window: Duration,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        Self::evict_expired(&mut entries, key, now);
        Self::insert_entry(&mut entries, key, timestamp, now.plus(window + ENTRY_TTL_GRACE))
    }

    async fn prune_and_count(&self, key: &str, cutoff: Timestamp) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        Self::evict_expired(&mut entries, key, now);
        Self::prune_log(&mut entries, key, cutoff)
    }

    async fn admit_entry(
        &self,
        key: &str,
        timestamp: Timestamp,
        cutoff: Timestamp,
        limit: u64,
        window: Duration,
    ) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        Self::evict_expired(&mut entries, key, now);
        let count = Self::prune_log(&mut entries, key, cutoff)?;
        if count < limit {
            Self::insert_entry(&mut entries, key, timestamp, now.plus(window + ENTRY_TTL_GRACE))?;
        }
        Ok(count)
    }

    async fn oldest_entry(&self, key: &str) -> Result<Option<Timestamp>, StoreError> {
        let now = self.clock.now();
        let entries = self.entries.read().await;

        match Self::peek(&entries, key, now).map(|v| &v.data) {
            None => Ok(None),
            Some(StoredData::Log { entries, .. }) => Ok(entries
                .first()
                .map(|(score, _)| Timestamp::from_unix_millis(*score))),
            Some(StoredData::Counter(_)) => Err(Self::wrong_type(key)),
        }
    }

    async fn current_count(&self, key: &str) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let entries = self.entries.read().await;

        match Self::peek(&entries, key, now).map(|v| &v.data) {
            None => Ok(0),
            Some(StoredData::Counter(count)) => Ok(*count),
            Some(StoredData::Log { .. }) => Err(Self::wrong_type(key)),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCounterStore").finish_non_exhaustive()
    }
}

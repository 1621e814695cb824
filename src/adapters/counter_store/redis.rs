//! Redis-backed counter store for production multi-server deployments.
//!
//! Each primitive is a single atomic unit on the server: the fixed-window
//! increment and the sliding-window admission are Lua scripts, the other
//! sorted-set operations are `MULTI` pipelines. Correctness under concurrency across processes rests on
//! Redis executing those units without interleaving.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::aio::MultiplexedConnection;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::config::RedisConfig;
use crate::domain::foundation::Timestamp;
use crate::ports::{CounterStore, KeyTtl, StoreError};

use super::ENTRY_TTL_GRACE;

/// INCR, then PEXPIRE only when the key carries no TTL yet.
///
/// Checking the TTL rather than `count == 1` also repairs a key whose
/// expiry was lost, so a counter can never become immortal.
static INCREMENT_AND_EXPIRE: Lazy<redis::Script> = Lazy::new(|| {
    redis::Script::new(
        r#"
        local count = redis.call('INCR', KEYS[1])
        if redis.call('PTTL', KEYS[1]) < 0 then
            redis.call('PEXPIRE', KEYS[1], ARGV[1])
        end
        return count
        "#,
    )
});

/// Prune, count and conditionally record a sliding-window entry.
///
/// KEYS[1] = log; ARGV = cutoff ms, limit, entry score, entry member, TTL ms.
/// Returns the count before recording.
static ADMIT_ENTRY: Lazy<redis::Script> = Lazy::new(|| {
    redis::Script::new(
        r#"
        redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
        local count = redis.call('ZCARD', KEYS[1])
        if count < tonumber(ARGV[2]) then
            redis.call('ZADD', KEYS[1], ARGV[3], ARGV[4])
            redis.call('PEXPIRE', KEYS[1], ARGV[5])
        end
        return count
        "#,
    )
});

/// Per-process sequence mixed into sorted-set members.
static ENTRY_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Redis-backed counter store.
///
/// Holds a multiplexed connection that is cheap to clone per call.
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: MultiplexedConnection,
}

impl RedisCounterStore {
    /// Wrap an existing multiplexed connection.
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    /// Open a client from configuration and establish the connection.
    pub async fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.url()).map_err(unavailable)?;
        let conn = tokio::time::timeout(
            config.timeout(),
            client.get_multiplexed_tokio_connection(),
        )
        .await
        .map_err(|_| StoreError::Timeout(config.timeout()))?
        .map_err(unavailable)?;

        tracing::info!(timeout_ms = config.timeout_ms, "connected to redis counter store");
        Ok(Self::new(conn))
    }

    /// Unique sorted-set member for an entry at `timestamp`.
    ///
    /// The process-wide sequence guarantees uniqueness within a process and
    /// the random UUID across processes, so two requests in the same
    /// millisecond never collapse into one member.
    fn entry_member(timestamp: Timestamp) -> String {
        let seq = ENTRY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}-{}-{}",
            timestamp.as_unix_millis(),
            seq,
            Uuid::new_v4().simple()
        )
    }
}

fn unavailable(e: redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment_and_expire(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();

        let count: u64 = INCREMENT_AND_EXPIRE
            .key(key)
            .arg(millis(window))
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(count)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let mut conn = self.conn.clone();

        let pttl: i64 = redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(KeyTtl::from_pttl(pttl))
    }

    async fn add_timestamped_entry(
        &self,
        key: &str,
        timestamp: Timestamp,
        window: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();

        let () = redis::pipe()
            .atomic()
            .cmd("ZADD")
            .arg(key)
            .arg(timestamp.as_unix_millis())
            .arg(Self::entry_member(timestamp))
            .ignore()
            .cmd("PEXPIRE")
            .arg(key)
            .arg(millis(window + ENTRY_TTL_GRACE))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(())
    }

    async fn prune_and_count(&self, key: &str, cutoff: Timestamp) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();

        // Inclusive bound: an entry exactly one window old is gone.
        let (_removed, count): (u64, u64) = redis::pipe()
            .atomic()
            .cmd("ZREMRANGEBYSCORE")
            .arg(key)
            .arg("-inf")
            .arg(cutoff.as_unix_millis())
            .cmd("ZCARD")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(count)
    }

    async fn admit_entry(
        &self,
        key: &str,
        timestamp: Timestamp,
        cutoff: Timestamp,
        limit: u64,
        window: Duration,
    ) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();

        let count: u64 = ADMIT_ENTRY
            .key(key)
            .arg(cutoff.as_unix_millis())
            .arg(limit)
            .arg(timestamp.as_unix_millis())
            .arg(Self::entry_member(timestamp))
            .arg(millis(window + ENTRY_TTL_GRACE))
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(count)
    }

    async fn oldest_entry(&self, key: &str) -> Result<Option<Timestamp>, StoreError> {
        let mut conn = self.conn.clone();

        let oldest: Vec<(String, f64)> = redis::cmd("ZRANGE")
            .arg(key)
            .arg(0)
            .arg(0)
            .arg("WITHSCORES")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(oldest
            .first()
            .map(|(_, score)| Timestamp::from_unix_millis(*score as i64)))
    }

    async fn current_count(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();

        let count: Option<u64> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(count.unwrap_or(0))
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();

        let _deleted: u64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(())
    }
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore").finish_non_exhaustive()
    }
}

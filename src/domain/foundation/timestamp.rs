//! Timestamp value object for immutable points in time.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable point in time, always UTC, millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Creates a timestamp from Unix milliseconds.
    ///
    /// Out-of-range values clamp to the Unix epoch.
    pub fn from_unix_millis(millis: i64) -> Self {
        Self(Utc.timestamp_millis_opt(millis).single().unwrap_or_default())
    }

    /// Returns the timestamp as Unix milliseconds.
    pub fn as_unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Creates a new timestamp offset forward by `duration`.
    pub fn plus(&self, duration: Duration) -> Self {
        Self::from_unix_millis(self.as_unix_millis().saturating_add(duration_millis(duration)))
    }

    /// Creates a new timestamp offset backward by `duration`.
    pub fn minus(&self, duration: Duration) -> Self {
        Self::from_unix_millis(self.as_unix_millis().saturating_sub(duration_millis(duration)))
    }

    /// Returns the time remaining from `self` until `later`.
    ///
    /// Zero if `later` is not after `self`.
    pub fn until(&self, later: &Timestamp) -> Duration {
        let delta = later.as_unix_millis() - self.as_unix_millis();
        Duration::from_millis(delta.max(0) as u64)
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

//! Adapters - Implementations of port interfaces.
//!
//! - `counter_store` - Redis, in-memory and timeout-bounded counter stores
//! - `clock` - System and manually driven clocks
//! - `metrics` - Atomic counters for rate limiting outcomes
//! - `http` - axum middleware and the decision service API

pub mod clock;
pub mod counter_store;
pub mod http;
pub mod metrics;

pub use clock::{ManualClock, SystemClock};
pub use counter_store::{InMemoryCounterStore, RedisCounterStore, TimeoutCounterStore};
pub use metrics::{AtomicRateLimitMetrics, MetricsSnapshot};

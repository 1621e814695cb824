//! Counter store adapters.
//!
//! Implementations of the CounterStore port for different backends.
//!
//! ## Available Adapters
//!
//! - `InMemoryCounterStore` - In-memory for testing and single-server
//! - `RedisCounterStore` - Redis-backed for production multi-server
//! - `TimeoutCounterStore` - Bounds every call of another store
//!
//! ## Usage
//!
//! ```ignore
//! use tiergate::adapters::counter_store::{RedisCounterStore, TimeoutCounterStore};
//!
//! let redis = RedisCounterStore::connect(&config.redis).await?;
//! let store = TimeoutCounterStore::new(Arc::new(redis), config.redis.timeout());
//! ```

use std::time::Duration;

mod in_memory;
mod redis;
mod timeout;

pub use in_memory::InMemoryCounterStore;
pub use redis::RedisCounterStore;
pub use timeout::TimeoutCounterStore;

/// Extra lifetime given to sliding-window logs beyond the window itself.
pub const ENTRY_TTL_GRACE: Duration = Duration::from_secs(1);

//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `CounterStore` - Shared atomic counters and timestamped logs
//! - `Clock` - Time source
//! - `RateLimitMetrics` - Outcome and fail-open reporting

mod clock;
mod counter_store;
mod rate_limit_metrics;

pub use clock::Clock;
pub use counter_store::{CounterStore, KeyTtl, StoreError};
pub use rate_limit_metrics::RateLimitMetrics;

//! Rate limiting use cases.
//!
//! - `PolicyResolver` - identity + endpoint to policy
//! - `FixedWindowLimiter` / `SlidingWindowLimiter` - algorithms over `CounterStore`
//! - `RateLimitService` - the decision surface, with admin bypass and fail-open

mod fixed_window;
mod policy_resolver;
mod service;
mod sliding_window;

pub use fixed_window::FixedWindowLimiter;
pub use policy_resolver::{PolicyError, PolicyResolver};
pub use service::{RateLimitError, RateLimitService};
pub use sliding_window::SlidingWindowLimiter;

use async_trait::async_trait;

use crate::domain::foundation::Timestamp;
use crate::domain::rate_limit::{Decision, Policy, RateLimitKey};
use crate::ports::StoreError;

/// A windowed limiting algorithm.
#[async_trait]
pub trait WindowLimiter: Send + Sync {
    /// Evaluate one request at `now`, consuming quota if allowed.
    async fn acquire(
        &self,
        key: &RateLimitKey,
        policy: &Policy,
        now: Timestamp,
    ) -> Result<Decision, StoreError>;

    /// Report the current quota without consuming any.
    async fn peek(
        &self,
        key: &RateLimitKey,
        policy: &Policy,
        now: Timestamp,
    ) -> Result<Decision, StoreError>;
}

//! Application layer - use cases coordinating domain types and ports.

pub mod rate_limit;

pub use rate_limit::{
    FixedWindowLimiter, PolicyError, PolicyResolver, RateLimitError, RateLimitService,
    SlidingWindowLimiter, WindowLimiter,
};

//! HTTP middleware for axum.
//!
//! - `rate_limit` - Tiered rate limiting with `X-RateLimit-*` headers

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimitState};

//! Domain layer containing rate limiting types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `rate_limit` - Identities, tiers, policies, and decisions

pub mod foundation;
pub mod rate_limit;

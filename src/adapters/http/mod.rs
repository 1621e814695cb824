//! HTTP adapters - axum middleware and the decision service API.

pub mod decision;
pub mod dto;
pub mod middleware;

pub use decision::{admin_router, decision_router, DecisionAppState};
pub use middleware::{rate_limit_middleware, RateLimitState};

//! HTTP adapter exposing the limiter as a standalone decision service:
//! - `GET /health` - Liveness and outcome counters
//! - `POST /v1/check` - Check and consume quota
//! - `POST /v1/status` - Read quota without consuming
//!
//! The administrative router, served on a separate internal listener:
//! - `POST /v1/reset` - Clear an identity's counters

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{DecisionApiError, DecisionAppState};
pub use routes::{admin_router, decision_router};

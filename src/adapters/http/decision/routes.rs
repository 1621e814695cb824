//! Axum routers for the decision API.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{check, health, reset, status, DecisionAppState};

/// Create the public decision API router.
///
/// # Routes
/// - `GET /health` - Liveness plus outcome counters
/// - `POST /v1/check` - Evaluate and consume quota
/// - `POST /v1/status` - Current quota, read-only
pub fn decision_router(state: DecisionAppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/check", post(check))
        .route("/v1/status", post(status))
        .with_state(state)
}

/// Create the administrative router.
///
/// Serve this on an internal-only listener; it carries no authentication.
///
/// # Routes
/// - `GET /health` - Liveness plus outcome counters
/// - `POST /v1/reset` - Clear counters
pub fn admin_router(state: DecisionAppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/reset", post(reset))
        .with_state(state)
}

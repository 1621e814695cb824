//! HTTP handlers for the decision API.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::adapters::http::dto::{DataBody, ErrorBody};
use crate::adapters::http::middleware::rate_limit::{add_rate_limit_headers, rate_limit_response};
use crate::adapters::metrics::AtomicRateLimitMetrics;
use crate::application::{PolicyError, RateLimitError, RateLimitService};
use crate::domain::foundation::ValidationError;

use super::dto::{DecisionRequest, DecisionResponse, HealthResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the decision API.
#[derive(Clone)]
pub struct DecisionAppState {
    pub service: Arc<RateLimitService>,
    pub metrics: Arc<AtomicRateLimitMetrics>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// `GET /health`
pub async fn health(State(state): State<DecisionAppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        metrics: state.metrics.snapshot(),
    })
}

/// `POST /v1/check` - consumes quota. 429 with the error envelope when denied.
pub async fn check(
    State(state): State<DecisionAppState>,
    Json(request): Json<DecisionRequest>,
) -> Result<Response, DecisionApiError> {
    let identity = request.identity.into_identity()?;
    let decision = match request.algorithm {
        Some(algorithm) => {
            state
                .service
                .check_with(&identity, &request.endpoint, algorithm)
                .await
        }
        None => state.service.check(&identity, &request.endpoint).await,
    };

    if !decision.allowed {
        return Ok(rate_limit_response(&decision));
    }

    let mut response = Json(DataBody::new(DecisionResponse::from(&decision))).into_response();
    if decision.is_enforced() {
        add_rate_limit_headers(response.headers_mut(), &decision);
    }
    Ok(response)
}

/// `POST /v1/status` - reports quota without consuming it.
pub async fn status(
    State(state): State<DecisionAppState>,
    Json(request): Json<DecisionRequest>,
) -> Result<impl IntoResponse, DecisionApiError> {
    let identity = request.identity.into_identity()?;
    let decision = state.service.status(&identity, &request.endpoint).await?;
    Ok(Json(DataBody::new(DecisionResponse::from(&decision))))
}

/// `POST /v1/reset` - clears the identity's counters for an endpoint.
pub async fn reset(
    State(state): State<DecisionAppState>,
    Json(request): Json<DecisionRequest>,
) -> Result<impl IntoResponse, DecisionApiError> {
    let identity = request.identity.into_identity()?;
    state.service.reset(&identity, &request.endpoint).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts application errors to HTTP responses.
#[derive(Debug)]
pub enum DecisionApiError {
    InvalidIdentity(ValidationError),
    RateLimit(RateLimitError),
}

impl From<ValidationError> for DecisionApiError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidIdentity(err)
    }
}

impl From<RateLimitError> for DecisionApiError {
    fn from(err: RateLimitError) -> Self {
        Self::RateLimit(err)
    }
}

impl IntoResponse for DecisionApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            DecisionApiError::InvalidIdentity(_) => (StatusCode::BAD_REQUEST, "INVALID_IDENTITY"),
            DecisionApiError::RateLimit(RateLimitError::Store(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
            }
            DecisionApiError::RateLimit(RateLimitError::Policy(PolicyError::NotFound { .. })) => {
                (StatusCode::NOT_FOUND, "POLICY_NOT_FOUND")
            }
            DecisionApiError::RateLimit(RateLimitError::Policy(PolicyError::Invalid { .. })) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "POLICY_INVALID")
            }
        };

        let message = match &self {
            DecisionApiError::InvalidIdentity(err) => err.to_string(),
            DecisionApiError::RateLimit(err) => err.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(code, error = %message, "Decision API request failed");
        }

        (status, Json(ErrorBody::new(code, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::StoreError;
    use std::time::Duration;

    #[test]
    fn invalid_identity_maps_to_bad_request() {
        let err = DecisionApiError::from(ValidationError::empty_field("identity"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failure_maps_to_service_unavailable() {
        let err = DecisionApiError::from(RateLimitError::from(StoreError::Timeout(
            Duration::from_millis(250),
        )));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn missing_policy_maps_to_not_found() {
        let err = DecisionApiError::from(RateLimitError::from(PolicyError::NotFound {
            endpoint: "api".to_string(),
        }));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}

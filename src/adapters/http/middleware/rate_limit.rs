//! Rate limiting middleware for axum.
//!
//! Every request is checked against the `RateLimitService`:
//! 1. The identity comes from an `Identity` extension set by upstream auth,
//!    falling back to the client IP for unauthenticated traffic
//! 2. The endpoint key comes from the state override or the matched route
//! 3. Denied requests short-circuit with 429 Too Many Requests
//!
//! Enforced decisions carry standard headers:
//! - `X-RateLimit-Limit`: Maximum requests allowed in the window
//! - `X-RateLimit-Remaining`: Requests remaining in the current window
//! - `X-RateLimit-Reset`: Unix time in milliseconds when quota frees up
//! - `Retry-After`: Seconds to wait (only on 429 response)
//!
//! Admin bypass and fail-open decisions pass through without headers.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::post, middleware};
//!
//! let state = RateLimitState::new(service).with_endpoint("ai_generate");
//!
//! let app = Router::new()
//!     .route("/api/ai/generate", post(handler))
//!     .layer(middleware::from_fn_with_state(state, rate_limit_middleware));
//! ```

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::RateLimitService;
use crate::domain::rate_limit::{Decision, Identity};

use crate::adapters::http::dto::ErrorBody;

/// Error code in the 429 body.
pub const RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";

/// Rate limiting middleware state.
#[derive(Clone)]
pub struct RateLimitState {
    service: Arc<RateLimitService>,
    endpoint: Option<Arc<str>>,
}

impl RateLimitState {
    pub fn new(service: Arc<RateLimitService>) -> Self {
        Self {
            service,
            endpoint: None,
        }
    }

    /// Use a fixed endpoint key instead of deriving one from the route.
    pub fn with_endpoint(mut self, endpoint: impl Into<Arc<str>>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Standard rate limit header names.
pub mod headers {
    use super::HeaderName;

    /// Maximum requests allowed in the window.
    pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
    /// Requests remaining in the current window.
    pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
    /// Unix time in milliseconds when the window resets.
    pub static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
}

/// Rate limiting middleware.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let identity = match request.extensions().get::<Identity>() {
        Some(identity) => identity.clone(),
        None => match extract_client_ip(request.headers(), connect_info.as_ref()) {
            Some(ip) => Identity::anonymous(ip),
            None => {
                tracing::debug!(path = %request.uri().path(), "No identity or client IP, skipping rate limit");
                return next.run(request).await;
            }
        },
    };

    let endpoint = match &state.endpoint {
        Some(endpoint) => endpoint.to_string(),
        None => {
            let path = request
                .extensions()
                .get::<MatchedPath>()
                .map(|matched| matched.as_str())
                .unwrap_or_else(|| request.uri().path());
            endpoint_key(path)
        }
    };

    let decision = state.service.check(&identity, &endpoint).await;
    if !decision.allowed {
        return rate_limit_response(&decision);
    }

    let mut response = next.run(request).await;
    if decision.is_enforced() {
        add_rate_limit_headers(response.headers_mut(), &decision);
    }
    response
}

/// Extract client IP, checking forwarded headers first.
///
/// Order of precedence:
/// 1. X-Forwarded-For header (first IP in list)
/// 2. X-Real-IP header
/// 3. ConnectInfo socket address
///
/// Unparseable header values fall through to the next source.
pub fn extract_client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<IpAddr> {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse().ok());
    if forwarded.is_some() {
        return forwarded;
    }

    let real_ip = headers
        .get("X-Real-IP")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.trim().parse().ok());
    if real_ip.is_some() {
        return real_ip;
    }

    connect_info.map(|ci| ci.0.ip())
}

/// Endpoint key for a route path: `/api/ai/generate` becomes `api_ai_generate`.
pub fn endpoint_key(path: &str) -> String {
    let key = path
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|segment| !segment.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_");

    if key.is_empty() {
        "root".to_string()
    } else {
        key
    }
}

/// Build the 429 Too Many Requests response for a denial.
pub fn rate_limit_response(decision: &Decision) -> Response {
    let message = format!(
        "Rate limit exceeded. Try again in {} seconds.",
        decision.retry_after_secs
    );
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorBody::new(RATE_LIMIT_EXCEEDED, message)),
    )
        .into_response();

    let headers = response.headers_mut();
    add_rate_limit_headers(headers, decision);
    headers.insert(header::RETRY_AFTER, HeaderValue::from(decision.retry_after_secs));
    response
}

/// Attach the `X-RateLimit-*` headers for a decision.
pub fn add_rate_limit_headers(headers: &mut HeaderMap, decision: &Decision) {
    headers.insert(headers::X_RATELIMIT_LIMIT.clone(), HeaderValue::from(decision.limit));
    headers.insert(
        headers::X_RATELIMIT_REMAINING.clone(),
        HeaderValue::from(decision.remaining),
    );
    headers.insert(
        headers::X_RATELIMIT_RESET.clone(),
        HeaderValue::from(decision.reset_at.as_unix_millis()),
    );
}

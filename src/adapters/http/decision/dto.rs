//! Request and response types for the decision API.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::adapters::metrics::MetricsSnapshot;
use crate::domain::foundation::{UserId, ValidationError};
use crate::domain::rate_limit::{Algorithm, Decision, DecisionSource, Identity, ServiceTier};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// The principal to evaluate. Exactly one of `user_id` or `ip` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub ip: Option<IpAddr>,
    /// Ignored for IP identities.
    #[serde(default)]
    pub tier: Option<ServiceTier>,
    #[serde(default)]
    pub admin: bool,
}

impl IdentityRequest {
    pub fn into_identity(self) -> Result<Identity, ValidationError> {
        let identity = match (self.user_id, self.ip) {
            (Some(user_id), None) => Identity::user(UserId::new(user_id)?, self.tier),
            (None, Some(ip)) => Identity::anonymous(ip),
            (Some(_), Some(_)) => {
                return Err(ValidationError::invalid_format(
                    "identity",
                    "give either user_id or ip, not both",
                ))
            }
            (None, None) => return Err(ValidationError::empty_field("identity")),
        };
        Ok(identity.with_admin(self.admin))
    }
}

/// Body of `/v1/check`, `/v1/status` and `/v1/reset`.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionRequest {
    pub identity: IdentityRequest,
    pub endpoint: String,
    /// Overrides the endpoint's configured algorithm (check only).
    #[serde(default)]
    pub algorithm: Option<Algorithm>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// A decision on the wire. `reset_at` is Unix milliseconds.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionResponse {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: i64,
    pub retry_after_secs: u32,
    pub source: DecisionSource,
}

impl From<&Decision> for DecisionResponse {
    fn from(decision: &Decision) -> Self {
        Self {
            allowed: decision.allowed,
            limit: decision.limit,
            remaining: decision.remaining,
            reset_at: decision.reset_at.as_unix_millis(),
            retry_after_secs: decision.retry_after_secs,
            source: decision.source,
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub metrics: MetricsSnapshot,
}

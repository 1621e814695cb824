//! Maps an identity and endpoint to the policy that governs it.

use crate::config::RateLimitConfig;
use crate::domain::foundation::ValidationError;
use crate::domain::rate_limit::{Algorithm, EffectivePolicy, Identity};

/// Policy resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PolicyError {
    /// No override, tier, or global default applies.
    #[error("no rate limit policy for endpoint '{endpoint}'")]
    NotFound { endpoint: String },

    /// A configured policy has a zero limit or window.
    #[error("invalid rate limit policy for endpoint '{endpoint}': {source}")]
    Invalid {
        endpoint: String,
        #[source]
        source: ValidationError,
    },
}

/// Resolves policies from the static configuration tables.
///
/// Resolution order, first match wins:
/// 1. administrative identities are unlimited
/// 2. per-endpoint override (tier-specific, then blanket)
/// 3. the identity's tier default
/// 4. the global default
#[derive(Debug, Clone)]
pub struct PolicyResolver {
    config: RateLimitConfig,
}

impl PolicyResolver {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { config }
    }

    pub fn resolve(&self, identity: &Identity, endpoint: &str) -> Result<EffectivePolicy, PolicyError> {
        if identity.is_admin() {
            return Ok(EffectivePolicy::Unlimited);
        }

        let configured = self
            .config
            .endpoints
            .get(endpoint)
            .and_then(|rule| rule.policy_for(identity.tier()))
            .or_else(|| identity.tier().map(|tier| *self.config.tiers.get(tier)))
            .or(self.config.default_policy)
            .ok_or_else(|| PolicyError::NotFound {
                endpoint: endpoint.to_string(),
            })?;

        configured
            .to_policy(self.config.default_window_secs)
            .map(EffectivePolicy::Limited)
            .map_err(|source| PolicyError::Invalid {
                endpoint: endpoint.to_string(),
                source,
            })
    }

    /// Algorithm configured for `endpoint`.
    pub fn algorithm_for(&self, endpoint: &str) -> Algorithm {
        self.config.algorithm_for(endpoint)
    }
}

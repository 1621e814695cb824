//! Rate limit configuration types.
//!
//! Static policy tables loaded once at startup: a default per service tier,
//! per-endpoint overrides, and the global fallback for traffic with no tier.
//! Tier tables use one field per tier so a missing tier is a load error,
//! not a runtime surprise.

use serde::Deserialize;
use std::collections::HashMap;

use crate::domain::foundation;
use crate::domain::rate_limit::{Algorithm, Policy, ServiceTier};

use super::error::ValidationError;

/// Complete rate limit configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Window applied when a policy omits `window_secs`.
    #[serde(default = "default_window_secs")]
    pub default_window_secs: u32,

    /// Algorithm for endpoints without an explicit choice.
    #[serde(default)]
    pub default_algorithm: Algorithm,

    /// Global fallback for identities without a tier (IP-guarded traffic).
    #[serde(default = "default_fallback_policy")]
    pub default_policy: Option<PolicyConfig>,

    /// Per-tier defaults.
    #[serde(default)]
    pub tiers: TierLimits,

    /// Per-endpoint overrides keyed by endpoint key.
    #[serde(default = "default_endpoints")]
    pub endpoints: HashMap<String, EndpointRule>,
}

/// A configured limit; the window falls back to the configured default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PolicyConfig {
    pub limit: u32,
    #[serde(default)]
    pub window_secs: Option<u32>,
}

/// Default limits for each service tier.
#[derive(Debug, Clone, Deserialize)]
pub struct TierLimits {
    #[serde(default = "TierLimits::default_free")]
    pub free: PolicyConfig,
    #[serde(default = "TierLimits::default_standard")]
    pub standard: PolicyConfig,
    #[serde(default = "TierLimits::default_premium")]
    pub premium: PolicyConfig,
}

/// Optional tier-specific overrides within an endpoint rule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TierOverrides {
    #[serde(default)]
    pub free: Option<PolicyConfig>,
    #[serde(default)]
    pub standard: Option<PolicyConfig>,
    #[serde(default)]
    pub premium: Option<PolicyConfig>,
}

/// Override rule for one endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointRule {
    /// Blanket limit for every tier on this endpoint.
    #[serde(default)]
    pub limit: Option<u32>,
    /// Window for the blanket limit and for tier overrides without one.
    #[serde(default)]
    pub window_secs: Option<u32>,
    /// Algorithm for this endpoint.
    #[serde(default)]
    pub algorithm: Option<Algorithm>,
    /// Tier-specific limits; these beat the blanket limit.
    #[serde(default)]
    pub tiers: TierOverrides,
}

impl PolicyConfig {
    /// A limit over one minute.
    pub fn per_minute(limit: u32) -> Self {
        Self {
            limit,
            window_secs: Some(60),
        }
    }

    /// Build the domain policy, filling the window from `default_window_secs`.
    pub fn to_policy(&self, default_window_secs: u32) -> Result<Policy, foundation::ValidationError> {
        Policy::new(self.limit, self.window_secs.unwrap_or(default_window_secs))
    }
}

impl TierLimits {
    fn default_free() -> PolicyConfig {
        PolicyConfig::per_minute(10)
    }

    fn default_standard() -> PolicyConfig {
        PolicyConfig::per_minute(60)
    }

    fn default_premium() -> PolicyConfig {
        PolicyConfig::per_minute(300)
    }

    /// The limit configured for `tier`.
    pub fn get(&self, tier: ServiceTier) -> &PolicyConfig {
        match tier {
            ServiceTier::Free => &self.free,
            ServiceTier::Standard => &self.standard,
            ServiceTier::Premium => &self.premium,
        }
    }
}

impl Default for TierLimits {
    fn default() -> Self {
        Self {
            free: Self::default_free(),
            standard: Self::default_standard(),
            premium: Self::default_premium(),
        }
    }
}

impl TierOverrides {
    pub fn get(&self, tier: ServiceTier) -> Option<&PolicyConfig> {
        match tier {
            ServiceTier::Free => self.free.as_ref(),
            ServiceTier::Standard => self.standard.as_ref(),
            ServiceTier::Premium => self.premium.as_ref(),
        }
    }
}

impl EndpointRule {
    /// The override that applies to `tier`, if any.
    ///
    /// A tier-specific entry wins over the blanket limit. Tier entries
    /// without a window inherit the rule's window.
    pub fn policy_for(&self, tier: Option<ServiceTier>) -> Option<PolicyConfig> {
        let tiered = tier.and_then(|t| self.tiers.get(t)).map(|p| PolicyConfig {
            limit: p.limit,
            window_secs: p.window_secs.or(self.window_secs),
        });
        tiered.or_else(|| {
            self.limit.map(|limit| PolicyConfig {
                limit,
                window_secs: self.window_secs,
            })
        })
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_window_secs: default_window_secs(),
            default_algorithm: Algorithm::default(),
            default_policy: default_fallback_policy(),
            tiers: TierLimits::default(),
            endpoints: default_endpoints(),
        }
    }
}

impl RateLimitConfig {
    /// Algorithm configured for `endpoint`.
    pub fn algorithm_for(&self, endpoint: &str) -> Algorithm {
        self.endpoints
            .get(endpoint)
            .and_then(|rule| rule.algorithm)
            .unwrap_or(self.default_algorithm)
    }

    /// Validate every policy table so misconfiguration fails at startup.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_window_secs == 0 {
            return Err(ValidationError::invalid_policy(
                "default_window_secs",
                "must be greater than zero",
            ));
        }

        let window = self.default_window_secs;
        let default = self
            .default_policy
            .as_ref()
            .ok_or(ValidationError::MissingDefaultPolicy)?;
        default
            .to_policy(window)
            .map_err(|e| ValidationError::invalid_policy("default_policy", e))?;

        for tier in ServiceTier::ALL {
            self.tiers
                .get(tier)
                .to_policy(window)
                .map_err(|e| ValidationError::invalid_policy(format!("tier {}", tier), e))?;
        }

        for (endpoint, rule) in &self.endpoints {
            if endpoint.is_empty() || endpoint.chars().any(char::is_whitespace) {
                return Err(ValidationError::InvalidEndpointKey(endpoint.clone()));
            }
            if rule.limit.is_none() && rule.window_secs.is_some() && tiers_empty(&rule.tiers) {
                return Err(ValidationError::invalid_policy(
                    format!("endpoint {}", endpoint),
                    "window_secs given without a limit",
                ));
            }
            for tier in ServiceTier::ALL {
                if let Some(policy) = rule.policy_for(Some(tier)) {
                    policy.to_policy(window).map_err(|e| {
                        ValidationError::invalid_policy(format!("endpoint {} ({})", endpoint, tier), e)
                    })?;
                }
            }
        }

        Ok(())
    }
}

fn tiers_empty(tiers: &TierOverrides) -> bool {
    ServiceTier::ALL.iter().all(|t| tiers.get(*t).is_none())
}

fn default_window_secs() -> u32 {
    60
}

fn default_fallback_policy() -> Option<PolicyConfig> {
    Some(PolicyConfig::per_minute(10))
}

fn default_endpoints() -> HashMap<String, EndpointRule> {
    let mut endpoints = HashMap::new();
    endpoints.insert(
        "ai_generate".to_string(),
        EndpointRule {
            limit: Some(5),
            window_secs: Some(60),
            algorithm: Some(Algorithm::SlidingWindow),
            tiers: TierOverrides::default(),
        },
    );
    endpoints
}

//! Resolved rate limit policies.

use std::time::Duration;

use crate::domain::foundation::ValidationError;

/// A positive request limit over a positive window.
///
/// Derived per request from tier and endpoint configuration; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    limit: u32,
    window_secs: u32,
}

impl Policy {
    /// Creates a policy, rejecting zero limits or windows.
    pub fn new(limit: u32, window_secs: u32) -> Result<Self, ValidationError> {
        if limit == 0 {
            return Err(ValidationError::not_positive("limit"));
        }
        if window_secs == 0 {
            return Err(ValidationError::not_positive("window_secs"));
        }
        Ok(Self { limit, window_secs })
    }

    /// Maximum requests allowed per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Window length in whole seconds.
    pub fn window_secs(&self) -> u32 {
        self.window_secs
    }

    /// Window length as a `Duration`.
    pub fn window(&self) -> Duration {
        Duration::from_secs(u64::from(self.window_secs))
    }
}

/// Outcome of policy resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectivePolicy {
    /// The identity is limited by this policy.
    Limited(Policy),
    /// Administrative identities are never limited.
    Unlimited,
}

//! Service tier definitions.
//!
//! Represents the subscription levels that determine a principal's default quota.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Subscription service level attached to an identity.
///
/// Changes only through external account updates, never by the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTier {
    /// Free tier - lowest quota.
    Free,
    /// Standard paid tier.
    Standard,
    /// Premium paid tier - highest quota.
    Premium,
}

impl ServiceTier {
    /// All tiers in ascending rank order.
    pub const ALL: [ServiceTier; 3] = [ServiceTier::Free, ServiceTier::Standard, ServiceTier::Premium];

    /// Returns the lowercase wire name of this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceTier::Free => "free",
            ServiceTier::Standard => "standard",
            ServiceTier::Premium => "premium",
        }
    }
}

impl fmt::Display for ServiceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ServiceTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(ServiceTier::Free),
            "standard" => Ok(ServiceTier::Standard),
            "premium" => Ok(ServiceTier::Premium),
            other => Err(ValidationError::invalid_format(
                "tier",
                format!("unknown tier '{}'", other),
            )),
        }
    }
}

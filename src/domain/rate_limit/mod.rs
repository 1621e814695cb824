//! Rate limiting domain types.
//!
//! Identities, tiers, policies, algorithms, and the normalized decision
//! returned to HTTP middleware.

mod algorithm;
mod decision;
mod identity;
mod key;
mod policy;
mod tier;

pub use algorithm::Algorithm;
pub use decision::{retry_after_secs, Decision, DecisionSource};
pub use identity::{Identity, Principal};
pub use key::RateLimitKey;
pub use policy::{EffectivePolicy, Policy};
pub use tier::ServiceTier;

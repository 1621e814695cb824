//! The rate-limited principal.

use std::fmt;
use std::net::IpAddr;

use crate::domain::foundation::UserId;

use super::ServiceTier;

/// Who is being limited: an authenticated user, or an anonymous client IP.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    /// Authenticated user.
    User(UserId),
    /// Unauthenticated client, keyed by IP address.
    Ip(IpAddr),
}

impl Principal {
    /// Returns the key scope for this principal.
    pub fn scope(&self) -> &'static str {
        match self {
            Principal::User(_) => "user",
            Principal::Ip(_) => "ip",
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::User(id) => write!(f, "user:{}", id),
            Principal::Ip(ip) => write!(f, "ip:{}", ip),
        }
    }
}

/// Rate-limited identity, immutable for the lifetime of a request.
///
/// Upstream authentication inserts this into request extensions; requests
/// without one are limited by client IP under the global default policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    principal: Principal,
    tier: Option<ServiceTier>,
    admin: bool,
}

impl Identity {
    /// Creates an identity for an authenticated user.
    pub fn user(id: UserId, tier: Option<ServiceTier>) -> Self {
        Self {
            principal: Principal::User(id),
            tier,
            admin: false,
        }
    }

    /// Creates an identity for unauthenticated traffic from `ip`.
    pub fn anonymous(ip: IpAddr) -> Self {
        Self {
            principal: Principal::Ip(ip),
            tier: None,
            admin: false,
        }
    }

    /// Marks this identity as administrative (bypasses rate limiting).
    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn tier(&self) -> Option<ServiceTier> {
        self.tier
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.principal)
    }
}

//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),

    #[error("Admin listener must not share the public address")]
    AdminAddressConflict,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Invalid rate limit policy for {scope}: {reason}")]
    InvalidPolicy { scope: String, reason: String },

    #[error("No global default rate limit policy configured")]
    MissingDefaultPolicy,

    #[error("Invalid endpoint key '{0}'")]
    InvalidEndpointKey(String),
}

impl ValidationError {
    pub(crate) fn invalid_policy(scope: impl Into<String>, reason: impl ToString) -> Self {
        ValidationError::InvalidPolicy {
            scope: scope.into(),
            reason: reason.to_string(),
        }
    }
}

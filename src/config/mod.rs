//! Application configuration module
//!
//! This module provides type-safe configuration loading from an optional
//! config file and environment variables using the `config` and `dotenvy`
//! crates. Environment variables use the `TIERGATE` prefix and nested
//! values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use tiergate::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod error;
mod rate_limit;
mod redis;
mod server;

pub use error::{ConfigError, ValidationError};
pub use rate_limit::{EndpointRule, PolicyConfig, RateLimitConfig, TierLimits, TierOverrides};
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;
use std::path::Path;

/// Environment variable naming an explicit config file.
pub const CONFIG_FILE_ENV: &str = "TIERGATE_CONFIG_FILE";

/// Root application configuration
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Redis configuration (counter store)
    pub redis: RedisConfig,

    /// Rate limit policy tables
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Load configuration from the environment
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads the file named by `TIERGATE_CONFIG_FILE`, or `tiergate.{yaml,toml,json}`
    ///    in the working directory if present
    /// 3. Overlays environment variables with `TIERGATE` prefix
    ///
    /// # Environment Variable Format
    ///
    /// - `TIERGATE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `TIERGATE__RATE_LIMIT__TIERS__FREE__LIMIT=20` -> `rate_limit.tiers.free.limit = 20`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required values are missing or cannot be
    /// parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) => Self::load_from(Some(Path::new(&path))),
            Err(_) => Self::load_from(None),
        }
    }

    /// Load configuration from `file` (required when given) plus environment.
    pub fn load_from(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("tiergate").required(false),
        };

        let config = config::Config::builder()
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix("TIERGATE").separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Rate limit tables are checked here so a missing default policy or a
    /// zero limit stops the process before it serves traffic.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.redis.validate()?;
        self.rate_limit.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

//! Gateway configuration types.
//!
//! Configuration is read from the process environment at start-up; every
//! field has a default so the gateway runs against a local server unchanged.

use serde::Deserialize;
use thiserror::Error;

/// An environment variable that holds an unusable value.
#[derive(Debug, Error)]
#[error("invalid value {value:?} for {var}: {reason}")]
pub struct ConfigError {
    /// Variable name.
    pub var: &'static str,
    /// The rejected value.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:3001").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// MongoDB connection string.
    #[serde(default = "GatewayConfig::default_mongodb_uri")]
    pub mongodb_uri: String,

    /// Database name.
    #[serde(default = "GatewayConfig::default_mongodb_database")]
    pub mongodb_database: String,

    /// Create the declared indexes at start-up.
    #[serde(default = "GatewayConfig::default_sync_indexes")]
    pub sync_indexes: bool,

    /// Allowed CORS origins.
    #[serde(default = "GatewayConfig::default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,
}

impl GatewayConfig {
    const DEFAULT_PORT: u16 = 3001;

    fn default_listen_addr() -> String {
        format!("0.0.0.0:{}", Self::DEFAULT_PORT)
    }

    fn default_mongodb_uri() -> String {
        "mongodb://localhost:27017/?directConnection=true".to_string()
    }

    fn default_mongodb_database() -> String {
        "lms".to_string()
    }

    const fn default_sync_indexes() -> bool {
        true
    }

    fn default_cors_origins() -> Vec<String> {
        vec!["*".to_string()]
    }

    const fn default_max_body() -> usize {
        1024 * 1024 // 1 MiB
    }

    /// Load the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration from an arbitrary variable source.
    ///
    /// `LISTEN_ADDR` wins over `PORT`; `PORT` alone binds all interfaces.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            let port: u16 = parse("PORT", &port)?;
            config.listen_addr = format!("0.0.0.0:{port}");
        }
        if let Some(addr) = lookup("LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(uri) = lookup("MONGODB_URI") {
            config.mongodb_uri = uri;
        }
        if let Some(database) = lookup("MONGODB_DATABASE") {
            config.mongodb_database = database;
        }
        if let Some(sync) = lookup("SYNC_INDEXES") {
            config.sync_indexes = parse("SYNC_INDEXES", &sync)?;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Some(max) = lookup("MAX_BODY_BYTES") {
            config.max_body_bytes = parse("MAX_BODY_BYTES", &max)?;
        }

        Ok(config)
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            mongodb_uri: Self::default_mongodb_uri(),
            mongodb_database: Self::default_mongodb_database(),
            sync_indexes: Self::default_sync_indexes(),
            cors_origins: Self::default_cors_origins(),
            max_body_bytes: Self::default_max_body(),
        }
    }
}

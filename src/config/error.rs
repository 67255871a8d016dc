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

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Host and port do not form a valid listen address")]
    InvalidListenAddress,

    #[error("Invalid {0} base URL format")]
    InvalidBaseUrl(&'static str),

    #[error("Served line id is not a UUID: {0}")]
    InvalidLineId(String),

    #[error("At least one served line must be configured")]
    NoLinesConfigured,

    #[error("Ticket visibility polling requires a non-zero interval")]
    InvalidPollInterval,

    #[error("Invalid menu document path")]
    InvalidMenuPath,

    #[error("Session TTL must be non-zero")]
    InvalidSessionTtl,
}

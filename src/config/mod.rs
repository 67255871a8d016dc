//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `HELPDESK_BOT` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use helpdesk_bot::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! let addr = config.server.socket_addr().expect("Invalid socket address");
//! println!("Server running on {}", addr);
//! ```

mod bot;
mod error;
mod gateway;
mod server;
mod ticketing;

pub use bot::BotConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use server::ServerConfig;
pub use ticketing::TicketingConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Contains all configuration sections for the helpdesk bot.
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (webhook listener)
    #[serde(default)]
    pub server: ServerConfig,

    /// Messaging gateway configuration (REST API, served lines)
    pub gateway: GatewayConfig,

    /// Ticketing backend configuration
    pub ticketing: TicketingConfig,

    /// Bot behavior configuration (menu document, files, timings)
    #[serde(default)]
    pub bot: BotConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `HELPDESK_BOT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `HELPDESK_BOT__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `HELPDESK_BOT__GATEWAY__BASE_URL=...` -> `gateway.base_url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("HELPDESK_BOT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.gateway.validate()?;
        self.ticketing.validate()?;
        self.bot.validate()?;
        Ok(())
    }
}

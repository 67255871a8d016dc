//! Ticketing backend configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Ticketing backend API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TicketingConfig {
    /// Base URL of the ticketing API
    pub base_url: String,

    /// API login
    #[serde(default)]
    pub login: String,

    /// API password
    #[serde(default)]
    pub password: String,

    /// End-to-end deadline for ticket submission, in seconds
    #[serde(default = "default_submit_deadline")]
    pub submit_deadline_secs: u64,

    /// Attempts to observe the created ticket before giving up.
    /// Visibility polling is best effort; observed deployments used
    /// 10 x 4s as well as 60 x 1s, so both knobs are tunable.
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,

    /// Delay between visibility polls, in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl TicketingConfig {
    pub fn submit_deadline(&self) -> Duration {
        Duration::from_secs(self.submit_deadline_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Validate ticketing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("ticketing.base_url"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl("ticketing"));
        }
        if self.poll_attempts > 0 && self.poll_interval_secs == 0 {
            return Err(ValidationError::InvalidPollInterval);
        }
        Ok(())
    }
}

fn default_submit_deadline() -> u64 {
    120
}

fn default_poll_attempts() -> u32 {
    10
}

fn default_poll_interval() -> u64 {
    4
}

//! Bot behavior configuration

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;

/// Dialog behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Path to the declarative menu document (YAML)
    #[serde(default = "default_menu_path")]
    pub menu_path: PathBuf,

    /// Directory holding reply attachments
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,

    /// Session record time-to-live, in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Delay between fragments of a multi-part reply, in milliseconds.
    /// Pacing keeps the chat UI from reordering messages.
    #[serde(default = "default_reply_pacing")]
    pub reply_pacing_ms: u64,

    /// Timeout for server-side exec commands, in seconds
    #[serde(default = "default_exec_timeout")]
    pub exec_timeout_secs: u64,

    /// Interval between menu document change checks, in seconds
    #[serde(default = "default_reload_poll")]
    pub reload_poll_secs: u64,
}

impl BotConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn reply_pacing(&self) -> Duration {
        Duration::from_millis(self.reply_pacing_ms)
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }

    pub fn reload_poll(&self) -> Duration {
        Duration::from_secs(self.reload_poll_secs)
    }

    /// Validate bot configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.menu_path.as_os_str().is_empty() {
            return Err(ValidationError::InvalidMenuPath);
        }
        if self.session_ttl_secs == 0 {
            return Err(ValidationError::InvalidSessionTtl);
        }
        Ok(())
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            menu_path: default_menu_path(),
            files_dir: default_files_dir(),
            session_ttl_secs: default_session_ttl(),
            reply_pacing_ms: default_reply_pacing(),
            exec_timeout_secs: default_exec_timeout(),
            reload_poll_secs: default_reload_poll(),
        }
    }
}

fn default_menu_path() -> PathBuf {
    PathBuf::from("config/menu.yml")
}

fn default_files_dir() -> PathBuf {
    PathBuf::from("files")
}

fn default_session_ttl() -> u64 {
    24 * 60 * 60
}

fn default_reply_pacing() -> u64 {
    250
}

fn default_exec_timeout() -> u64 {
    30
}

fn default_reload_poll() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_validation() {
        assert!(BotConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_menu_path_rejected() {
        let config = BotConfig {
            menu_path: PathBuf::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidMenuPath)
        ));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = BotConfig {
            session_ttl_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidSessionTtl)
        ));
    }
}

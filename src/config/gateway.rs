//! Messaging gateway configuration

use serde::Deserialize;
use uuid::Uuid;

use super::error::ValidationError;

/// Messaging gateway REST API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway REST API
    pub base_url: String,

    /// API login
    #[serde(default)]
    pub login: String,

    /// API password
    #[serde(default)]
    pub password: String,

    /// Author id stamped on outbound bot messages
    #[serde(default)]
    pub author_id: Option<Uuid>,

    /// Comma-separated ids of the support lines this bot serves
    pub lines: String,
}

impl GatewayConfig {
    /// Parse the configured line list into UUIDs.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when the list is empty or an entry is not
    /// a UUID.
    pub fn line_ids(&self) -> Result<Vec<Uuid>, ValidationError> {
        let ids = self
            .lines
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Uuid::parse_str(s).map_err(|_| ValidationError::InvalidLineId(s.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        if ids.is_empty() {
            return Err(ValidationError::NoLinesConfigured);
        }
        Ok(ids)
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("gateway.base_url"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl("gateway"));
        }
        self.line_ids()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> GatewayConfig {
        GatewayConfig {
            base_url: "https://gw.example.com/v1".to_string(),
            login: "bot".to_string(),
            password: "secret".to_string(),
            author_id: None,
            lines: "bb296731-3d58-4c4a-8227-315bdc2bf3ff".to_string(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_line_ids_parses_comma_list() {
        let mut config = base_config();
        config.lines = format!("{}, {}", Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(config.line_ids().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_lines_rejected() {
        let mut config = base_config();
        config.lines = " , ".to_string();
        assert!(matches!(
            config.line_ids(),
            Err(ValidationError::NoLinesConfigured)
        ));
    }

    #[test]
    fn test_garbage_line_rejected() {
        let mut config = base_config();
        config.lines = "not-a-uuid".to_string();
        assert!(matches!(
            config.line_ids(),
            Err(ValidationError::InvalidLineId(_))
        ));
    }

    #[test]
    fn test_bad_scheme_rejected() {
        let mut config = base_config();
        config.base_url = "ftp://gw.example.com".to_string();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidBaseUrl("gateway"))
        ));
    }
}

//! Configuration for the Aula client
//!
//! This module handles loading, parsing, and validating the client
//! configuration from YAML files or inline values.

use crate::error::{AulaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for [`ApiClient`](crate::client::ApiClient)
///
/// Every field has a sensible default so tests and tools can build a config
/// with struct-update syntax and only override what they need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the Aula backend (useful to override for tests and local
    /// mocks).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the token-refresh endpoint, joined onto `base_url`.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Service name under which tokens are stored in the OS keyring.
    #[serde(default = "default_credential_service")]
    pub credential_service: String,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_refresh_path() -> String {
    "/refresh-token".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_credential_service() -> String {
    "aula-client".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            refresh_path: default_refresh_path(),
            timeout_seconds: default_timeout(),
            credential_service: default_credential_service(),
        }
    }
}

impl ClientConfig {
    /// Parses a configuration from a YAML string.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AulaError::Yaml`] when the document is not valid YAML.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents).map_err(AulaError::Yaml)?;
        Ok(config)
    }

    /// Loads a configuration from a YAML file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`AulaError::Io`] when the file cannot be read and
    /// [`AulaError::Yaml`] when its contents do not parse.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(AulaError::Io)?;
        Self::from_yaml(&contents)
    }

    /// Validates the configuration.
    ///
    /// Checks that `base_url` parses as an absolute URL, that the refresh
    /// path is rooted, and that the timeout is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`AulaError::Config`] describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| AulaError::Config(format!("invalid base_url '{}': {}", self.base_url, e)))?;

        if !self.refresh_path.starts_with('/') {
            return Err(AulaError::Config(format!(
                "refresh_path must start with '/': '{}'",
                self.refresh_path
            ))
            .into());
        }

        if self.timeout_seconds == 0 {
            return Err(AulaError::Config("timeout_seconds must be non-zero".to_string()).into());
        }

        if self.credential_service.is_empty() {
            return Err(AulaError::Config("credential_service must not be empty".to_string()).into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.refresh_path, "/refresh-token");
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.credential_service, "aula-client");
    }

    #[test]
    fn test_from_yaml_with_all_fields() {
        let yaml = r#"
base_url: "https://api.aula.example"
refresh_path: "/auth/refresh-token"
timeout_seconds: 10
credential_service: "aula-staging"
"#;
        let config = ClientConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.base_url, "https://api.aula.example");
        assert_eq!(config.refresh_path, "/auth/refresh-token");
        assert_eq!(config.timeout_seconds, 10);
        assert_eq!(config.credential_service, "aula-staging");
    }

    #[test]
    fn test_from_yaml_missing_fields_use_defaults() {
        let yaml = r#"
base_url: "https://api.aula.example"
"#;
        let config = ClientConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.refresh_path, "/refresh-token");
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_from_yaml_rejects_invalid_document() {
        let result = ClientConfig::from_yaml("base_url: [not, a, string");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_unparseable_base_url() {
        let config = ClientConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("invalid base_url"), "got: {err}");
    }

    #[test]
    fn test_validate_rejects_unrooted_refresh_path() {
        let config = ClientConfig {
            refresh_path: "refresh-token".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("must start with '/'"), "got: {err}");
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ClientConfig {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_credential_service() {
        let config = ClientConfig {
            credential_service: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let original = ClientConfig {
            base_url: "https://api.aula.example".to_string(),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&original).unwrap();
        let restored = ClientConfig::from_yaml(&yaml).unwrap();
        assert_eq!(restored.base_url, original.base_url);
        assert_eq!(restored.refresh_path, original.refresh_path);
    }
}

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::{FailurePolicy, StoreConfig};

/// Environment variable that overrides `failure_policy` from the file.
pub const FAILURE_POLICY_ENV: &str = "EFFECTSTORE_FAILURE_POLICY";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl StoreConfig {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/effectstore/config.toml` on Unix/macOS,
    /// or equivalent on other platforms via `dirs::config_dir()`.
    /// Falls back to current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("effectstore").join("config.toml")
    }

    /// Loads configuration from the default config file.
    ///
    /// A missing file yields `StoreConfig::default()`; the
    /// `EFFECTSTORE_FAILURE_POLICY` override applies either way.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();

        let config = if path.exists() {
            Self::parse_file(&path)?
        } else {
            StoreConfig::default()
        };

        config.with_env_override(std::env::var(FAILURE_POLICY_ENV).ok())
    }

    /// Loads configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::parse_file(path)?.with_env_override(std::env::var(FAILURE_POLICY_ENV).ok())
    }

    fn parse_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: StoreConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        config.validate()?;
        Ok(config)
    }

    fn with_env_override(mut self, value: Option<String>) -> Result<Self, ConfigError> {
        if let Some(value) = value {
            self.failure_policy = value
                .parse::<FailurePolicy>()
                .map_err(|message| ConfigError::ValidationError { message })?;
        }
        Ok(self)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - `shutdown_timeout_ms` is non-zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shutdown_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "shutdown_timeout_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_replaces_policy() {
        let config = StoreConfig::default()
            .with_env_override(Some("LOG".to_string()))
            .unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Log);
    }

    #[test]
    fn missing_env_override_keeps_policy() {
        let config = StoreConfig::default()
            .with_failure_policy(FailurePolicy::Report)
            .with_env_override(None)
            .unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Report);
    }

    #[test]
    fn bad_env_override_is_a_validation_error() {
        let err = StoreConfig::default()
            .with_env_override(Some("shrug".to_string()))
            .unwrap_err();
        match err {
            ConfigError::ValidationError { message } => assert!(message.contains("shrug")),
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }
}

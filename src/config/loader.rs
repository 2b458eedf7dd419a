//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
    #[error("environment variable `{0}` holding the upstream credential is not set")]
    MissingSecret(String),
    #[error("upstream credential from `{0}` is not a valid header value")]
    InvalidSecret(String),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML document into a configuration without validating it.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load a configuration from a TOML file.
///
/// Validation is left to the caller so that command-line overrides can be
/// applied first.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Validate a configuration, wrapping violations in a [`ConfigError`].
pub fn ensure_valid(config: &ProxyConfig) -> Result<(), ConfigError> {
    validate_config(config).map_err(ConfigError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_surfaces() {
        let err = parse_config("[rate_limit]\nwindow_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_message_lists_every_error() {
        let mut config = ProxyConfig::default();
        config.rate_limit.window_secs = 0;
        config.rate_limit.max_requests = 0;

        let message = ensure_valid(&config).unwrap_err().to_string();
        assert_eq!(
            message,
            "Validation failed: rate_limit.window_secs must be greater than zero, \
             rate_limit.max_requests must be greater than zero"
        );
    }

    #[test]
    fn test_example_file_matches_defaults() {
        let config = parse_config(include_str!("../../proxy.example.toml")).unwrap();
        assert!(ensure_valid(&config).is_ok());

        let defaults = ProxyConfig::default();
        assert_eq!(config.listener.bind_address, defaults.listener.bind_address);
        assert_eq!(config.rate_limit.max_requests, defaults.rate_limit.max_requests);
        assert_eq!(config.forwarding.credentials, defaults.forwarding.credentials);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

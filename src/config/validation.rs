//! Configuration validation.
//!
//! Serde handles syntactic checks; this module checks value ranges and
//! that header names, origins and addresses are usable. All violations are
//! collected rather than stopping at the first.

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::{CredentialConfig, ProxyConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),
    #[error("rate_limit.window_secs must be greater than zero")]
    ZeroWindow,
    #[error("rate_limit.max_requests must be greater than zero")]
    ZeroMaxRequests,
    #[error("cors.allowed_origins entry `{0}` is not a valid header value")]
    Origin(String),
    #[error("forwarding.target_param must not be empty")]
    EmptyTargetParam,
    #[error("forwarding.passthrough_headers entry `{0}` is not a valid header name")]
    HeaderName(String),
    #[error("forwarding.default_content_type `{0}` is not a valid header value")]
    ContentType(String),
    #[error("forwarding.credentials.token_env must name an environment variable")]
    EmptyTokenEnv,
    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a configuration, returning every violation found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::ZeroMaxRequests);
    }

    for origin in &config.cors.allowed_origins {
        if HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::Origin(origin.clone()));
        }
    }

    let forwarding = &config.forwarding;
    if forwarding.target_param.is_empty() {
        errors.push(ValidationError::EmptyTargetParam);
    }
    for name in &forwarding.passthrough_headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::HeaderName(name.clone()));
        }
    }
    if HeaderValue::from_str(&forwarding.default_content_type).is_err() {
        errors.push(ValidationError::ContentType(forwarding.default_content_type.clone()));
    }
    if let CredentialConfig::Inject { token_env, .. } = &forwarding.credentials {
        if token_env.trim().is_empty() {
            errors.push(ValidationError::EmptyTokenEnv);
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

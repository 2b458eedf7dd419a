//! Request-level and startup errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;

/// Message returned when a request carries no target URL.
pub const MISSING_TARGET_MESSAGE: &str = "Please provide a target URL as a query parameter.";

/// Message returned when a client exhausts its window quota.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests from this IP, please try again later.";

/// Errors that terminate a single request before it reaches the target.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{}", MISSING_TARGET_MESSAGE)]
    MissingTarget,
    #[error("{}", RATE_LIMITED_MESSAGE)]
    RateLimited,
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),
    #[error("failed to read request body: {0}")]
    BadRequestBody(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingTarget => StatusCode::BAD_REQUEST,
            ProxyError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::BadRequestBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            // Plain text, like the rejection message of the limiter it replaces.
            ProxyError::RateLimited => (status, RATE_LIMITED_MESSAGE).into_response(),
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build upstream HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

//! Derivation of the outbound request from the inbound one.
//!
//! Only a minimal header set crosses the boundary: `Authorization` (per the
//! credential policy), `Content-Type` (defaulted), and any configured
//! passthrough headers. Host, cookies and hop-by-hop headers never reach the
//! target.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use bytes::Bytes;

use crate::config::{ConfigError, CredentialConfig, ForwardingConfig};
use crate::error::ProxyError;
use crate::http::request::InboundRequest;

/// Where the outbound `Authorization` header comes from.
#[derive(Clone)]
pub enum CredentialPolicy {
    /// Copy the caller's header, if present.
    Forward,
    /// Always send this value, replacing the caller's.
    Inject(HeaderValue),
}

impl std::fmt::Debug for CredentialPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialPolicy::Forward => f.write_str("Forward"),
            CredentialPolicy::Inject(_) => f.write_str("Inject(<redacted>)"),
        }
    }
}

impl CredentialPolicy {
    /// Resolve a configured policy, reading injected secrets through `lookup`.
    pub fn resolve<F>(config: &CredentialConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match config {
            CredentialConfig::Forward => Ok(CredentialPolicy::Forward),
            CredentialConfig::Inject { token_env, scheme } => {
                let secret = lookup(token_env)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ConfigError::MissingSecret(token_env.clone()))?;
                let value = if scheme.is_empty() {
                    secret
                } else {
                    format!("{} {}", scheme, secret)
                };
                let mut value = HeaderValue::from_str(&value)
                    .map_err(|_| ConfigError::InvalidSecret(token_env.clone()))?;
                value.set_sensitive(true);
                Ok(CredentialPolicy::Inject(value))
            }
        }
    }
}

/// Request to issue against the target.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Turns inbound requests into outbound ones.
#[derive(Debug, Clone)]
pub struct RequestTranslator {
    target_param: String,
    credentials: CredentialPolicy,
    passthrough: Vec<HeaderName>,
    default_content_type: HeaderValue,
}

impl RequestTranslator {
    pub fn new(
        target_param: impl Into<String>,
        credentials: CredentialPolicy,
        passthrough: Vec<HeaderName>,
        default_content_type: HeaderValue,
    ) -> Self {
        Self {
            target_param: target_param.into(),
            credentials,
            passthrough,
            default_content_type,
        }
    }

    /// Build from configuration, reading injected secrets from the process environment.
    pub fn from_config(config: &ForwardingConfig) -> Result<Self, ConfigError> {
        let credentials = CredentialPolicy::resolve(&config.credentials, |name| {
            std::env::var(name).ok()
        })?;
        // Names and values were checked by validation; invalid entries are skipped.
        let passthrough = config
            .passthrough_headers
            .iter()
            .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
            .filter(|name| *name != header::AUTHORIZATION && *name != header::CONTENT_TYPE)
            .collect();
        let default_content_type = HeaderValue::from_str(&config.default_content_type)
            .unwrap_or(HeaderValue::from_static("application/json"));

        Ok(Self::new(
            config.target_param.clone(),
            credentials,
            passthrough,
            default_content_type,
        ))
    }

    pub fn credentials(&self) -> &CredentialPolicy {
        &self.credentials
    }

    pub fn translate(&self, inbound: &InboundRequest) -> Result<OutboundRequest, ProxyError> {
        let url = inbound
            .query_param(&self.target_param)
            .filter(|url| !url.is_empty())
            .ok_or(ProxyError::MissingTarget)?
            .to_string();

        let mut headers = HeaderMap::new();

        match &self.credentials {
            CredentialPolicy::Forward => {
                if let Some(auth) = inbound.headers.get(header::AUTHORIZATION) {
                    headers.insert(header::AUTHORIZATION, auth.clone());
                }
            }
            CredentialPolicy::Inject(value) => {
                headers.insert(header::AUTHORIZATION, value.clone());
            }
        }

        let content_type = inbound
            .headers
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| self.default_content_type.clone());
        headers.insert(header::CONTENT_TYPE, content_type);

        for name in &self.passthrough {
            if let Some(value) = inbound.headers.get(name) {
                headers.insert(name.clone(), value.clone());
            }
        }

        Ok(OutboundRequest {
            method: inbound.method.clone(),
            url,
            headers,
            body: inbound.body.clone(),
        })
    }
}

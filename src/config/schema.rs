//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the forwarding proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Cross-origin access policy.
    pub cors: CorsConfig,

    /// Outbound request derivation and transport.
    pub forwarding: ForwardingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Largest inbound body buffered for forwarding, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

impl ListenerConfig {
    /// Replace the port of the bind address, keeping the host.
    pub fn set_port(&mut self, port: u16) {
        let host = match self.bind_address.rsplit_once(':') {
            Some((host, _)) => host.to_string(),
            None => self.bind_address.clone(),
        };
        self.bind_address = format!("{}:{}", host, port);
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Maximum admitted requests per client per window.
    pub max_requests: u32,

    /// Key clients by the first `X-Forwarded-For` entry instead of the peer address.
    /// Only safe behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 15 * 60,
            max_requests: 230,
            trust_forwarded_for: false,
        }
    }
}

/// Which request headers a preflight may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AllowedHeadersMode {
    /// Origin, X-Requested-With, Content-Type, Accept, Authorization.
    #[default]
    List,
    /// Any header the caller requests.
    Any,
}

/// Cross-origin access configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to read responses. Empty echoes every request origin.
    pub allowed_origins: Vec<String>,

    /// Allowed request headers for preflight.
    pub allowed_headers: AllowedHeadersMode,

    /// Emit `Access-Control-Allow-Credentials: true`.
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_headers: AllowedHeadersMode::List,
            allow_credentials: true,
        }
    }
}

/// Where the outbound `Authorization` header comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CredentialConfig {
    /// Forward the caller's `Authorization` header verbatim, if any.
    #[default]
    Forward,
    /// Replace it with a secret read from an environment variable at startup.
    Inject {
        /// Environment variable holding the secret.
        token_env: String,
        /// Authorization scheme prefixed to the secret.
        #[serde(default = "default_scheme")]
        scheme: String,
    },
}

fn default_scheme() -> String {
    "Bearer".to_string()
}

/// Outbound request configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Query parameter carrying the target URL.
    pub target_param: String,

    /// Extra inbound headers copied to the target (e.g. "language").
    pub passthrough_headers: Vec<String>,

    /// Content-Type sent when the caller supplied none.
    pub default_content_type: String,

    /// Authorization policy.
    pub credentials: CredentialConfig,

    /// Upstream request timeout in seconds. Unset keeps the client default (none).
    pub timeout_secs: Option<u64>,

    /// Strip markup from textual payload fields before forwarding.
    pub sanitize_payloads: bool,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            target_param: "url".to_string(),
            passthrough_headers: Vec::new(),
            default_content_type: "application/json".to_string(),
            credentials: CredentialConfig::Forward,
            timeout_secs: None,
            sanitize_payloads: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

//! Cross-origin access policy gate.
//!
//! Every response leaving the proxy carries the allow-origin, allow-methods
//! and allow-headers decision computed here. Preflight (`OPTIONS`) requests
//! are answered directly and never reach the forwarding handler.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::{AllowedHeadersMode, CorsConfig};
use crate::http::server::AppState;
use crate::observability::metrics;

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept, Authorization";

/// How the allowed origin is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Echo whatever origin the caller sent.
    Mirror,
    /// Echo the caller's origin only when listed.
    AllowList(Vec<HeaderValue>),
}

/// Result of evaluating one request.
#[derive(Debug, Clone)]
pub struct AccessDecision {
    /// `None` when the origin is not allowed.
    pub allow_origin: Option<HeaderValue>,
    pub allow_methods: HeaderValue,
    pub allow_headers: HeaderValue,
    pub allow_credentials: bool,
    /// The allowed origin depends on the request.
    pub vary_origin: bool,
    /// Answer immediately without forwarding.
    pub short_circuit: bool,
}

impl AccessDecision {
    /// Write the decision onto response headers, replacing any existing values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        match &self.allow_origin {
            Some(origin) => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            }
            None => {
                headers.remove(header::ACCESS_CONTROL_ALLOW_ORIGIN);
            }
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        if self.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if self.vary_origin {
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
        }
    }
}

/// The configured cross-origin policy.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    origins: OriginPolicy,
    headers: AllowedHeadersMode,
    allow_credentials: bool,
}

impl AccessPolicy {
    pub fn new(origins: OriginPolicy, headers: AllowedHeadersMode, allow_credentials: bool) -> Self {
        Self {
            origins,
            headers,
            allow_credentials,
        }
    }

    /// Build from configuration. Origins that are not valid header values
    /// are rejected by validation beforehand and skipped here.
    pub fn from_config(config: &CorsConfig) -> Self {
        let origins = if config.allowed_origins.is_empty() {
            OriginPolicy::Mirror
        } else {
            OriginPolicy::AllowList(
                config
                    .allowed_origins
                    .iter()
                    .filter_map(|o| HeaderValue::from_str(o).ok())
                    .collect(),
            )
        };
        Self::new(origins, config.allowed_headers, config.allow_credentials)
    }

    /// Echoing any origin while allowing credentials lets every site make
    /// credentialed calls through the proxy.
    pub fn is_permissive_with_credentials(&self) -> bool {
        self.allow_credentials && self.origins == OriginPolicy::Mirror
    }

    pub fn evaluate(
        &self,
        origin: Option<&HeaderValue>,
        requested_headers: Option<&HeaderValue>,
        method: &Method,
    ) -> AccessDecision {
        let (allow_origin, vary_origin) = match (origin, &self.origins) {
            (None, _) => (Some(HeaderValue::from_static("*")), false),
            (Some(origin), OriginPolicy::Mirror) => (Some(origin.clone()), true),
            (Some(origin), OriginPolicy::AllowList(allowed)) => {
                (allowed.iter().find(|a| *a == origin).cloned(), true)
            }
        };

        let allow_headers = match self.headers {
            AllowedHeadersMode::List => HeaderValue::from_static(ALLOWED_HEADERS),
            AllowedHeadersMode::Any => requested_headers
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static("*")),
        };

        AccessDecision {
            allow_origin,
            allow_methods: HeaderValue::from_static(ALLOWED_METHODS),
            allow_headers,
            allow_credentials: self.allow_credentials,
            vary_origin,
            short_circuit: *method == Method::OPTIONS,
        }
    }
}

/// Middleware attaching the access decision to every response.
pub async fn access_policy_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let decision = state.access.evaluate(
        request.headers().get(header::ORIGIN),
        request.headers().get(header::ACCESS_CONTROL_REQUEST_HEADERS),
        request.method(),
    );

    let mut response = if decision.short_circuit {
        tracing::debug!(path = %request.uri().path(), "Answering preflight");
        metrics::record_preflight();
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    decision.apply(response.headers_mut());
    response
}

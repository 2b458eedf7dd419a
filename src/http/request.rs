//! Inbound request extraction.
//!
//! # Responsibilities
//! - Buffer the request body up to the configured limit
//! - Decode query parameters (percent-decoding, last value wins)
//! - Hand the forwarding pipeline a read-only snapshot of the request
//!
//! # Design Decisions
//! - The body is buffered, not streamed, so it can be sanitized and replayed
//! - An empty body is treated as absent

use std::collections::HashMap;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request},
};
use bytes::Bytes;

use crate::error::ProxyError;
use crate::security::sanitize::sanitize_body;

/// Snapshot of a caller's request as seen by the forwarding pipeline.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl InboundRequest {
    /// Consume an axum request, buffering at most `body_limit` bytes of body.
    pub async fn from_request(request: Request<Body>, body_limit: usize) -> Result<Self, ProxyError> {
        let (parts, body) = request.into_parts();

        let bytes = axum::body::to_bytes(body, body_limit).await.map_err(|e| {
            if is_length_limit(&e) {
                ProxyError::PayloadTooLarge(body_limit)
            } else {
                ProxyError::BadRequestBody(e.to_string())
            }
        })?;

        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parse_query(parts.uri.query()),
            headers: parts.headers,
            body: (!bytes.is_empty()).then_some(bytes),
        })
    }

    /// Decoded query parameter value.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Header lookup; names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Strip markup from the body's textual fields.
    pub fn sanitized(mut self) -> Self {
        if let Some(body) = self.body.take() {
            let cleaned = sanitize_body(self.content_type(), body);
            self.body = Some(cleaned);
        }
        self
    }
}

/// Parse a raw query string into a map, percent-decoding keys and values.
/// Repeated keys keep the last value.
pub fn parse_query(raw: Option<&str>) -> HashMap<String, String> {
    raw.map(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .into_owned()
            .collect()
    })
    .unwrap_or_default()
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.to_string().contains("length limit exceeded") {
            return true;
        }
        source = e.source();
    }
    false
}

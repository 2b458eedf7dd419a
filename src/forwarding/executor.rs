//! Issuing the outbound request.
//!
//! A response from the target, whatever its status, is a
//! [`OutboundOutcome::Success`]. Only transport failures, or a response
//! whose body could not be read, become [`OutboundOutcome::Failure`].
//! Nothing is retried.

use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use futures_util::future::BoxFuture;

use crate::config::ForwardingConfig;
use crate::forwarding::translator::OutboundRequest;

/// What happened when the target was called.
#[derive(Debug, Clone)]
pub enum OutboundOutcome {
    /// The target answered.
    Success {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },
    /// No usable answer was obtained.
    Failure {
        /// Status of the target's response, when one arrived before the failure.
        status: Option<StatusCode>,
        message: String,
        /// Body of the target's response, when available.
        details: Option<Bytes>,
    },
}

impl OutboundOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, OutboundOutcome::Success { .. })
    }
}

/// Executes outbound requests. Implemented by the HTTP client and by test doubles.
pub trait Forwarder: Send + Sync {
    fn execute(&self, request: OutboundRequest) -> BoxFuture<'_, OutboundOutcome>;
}

/// [`Forwarder`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
}

impl HttpForwarder {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a client with the configured timeout, if any. Redirects follow
    /// the client default.
    pub fn from_config(config: &ForwardingConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self::new(builder.build()?))
    }

    async fn send(&self, request: OutboundRequest) -> OutboundOutcome {
        let mut builder = self
            .client
            .request(request.method, request.url.as_str())
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "Transport failure");
                return OutboundOutcome::Failure {
                    status: e.status(),
                    message: describe(&e),
                    details: None,
                };
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        match response.bytes().await {
            Ok(body) => OutboundOutcome::Success {
                status,
                headers,
                body,
            },
            Err(e) => OutboundOutcome::Failure {
                status: Some(status),
                message: describe(&e),
                details: None,
            },
        }
    }
}

impl Forwarder for HttpForwarder {
    fn execute(&self, request: OutboundRequest) -> BoxFuture<'_, OutboundOutcome> {
        Box::pin(self.send(request))
    }
}

/// Human-readable description including the underlying cause chain.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

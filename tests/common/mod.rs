//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::{Body, Bytes},
    extract::connect_info::MockConnectInfo,
    http::{HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use cors_forward_proxy::config::ProxyConfig;
use cors_forward_proxy::forwarding::{Forwarder, OutboundOutcome, OutboundRequest};
use cors_forward_proxy::http::{build_router, AppState};
use cors_forward_proxy::{HttpServer, Shutdown};
use futures_util::future::BoxFuture;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Forwarder double that records every request and answers with a fixed outcome.
pub struct RecordingForwarder {
    calls: Mutex<Vec<OutboundRequest>>,
    outcome: OutboundOutcome,
}

impl RecordingForwarder {
    pub fn new(outcome: OutboundOutcome) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            outcome,
        })
    }

    pub fn ok_json(body: &'static str) -> Arc<Self> {
        Self::new(OutboundOutcome::Success {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        })
    }

    pub fn calls(&self) -> Vec<OutboundRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Forwarder for RecordingForwarder {
    fn execute(&self, request: OutboundRequest) -> BoxFuture<'_, OutboundOutcome> {
        self.calls.lock().unwrap().push(request);
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}

/// Router with the given forwarder, as seen from `client`.
pub fn router_with(state: AppState, client: SocketAddr) -> Router {
    build_router(state).layer(MockConnectInfo(client))
}

pub fn state_with(config: &ProxyConfig, forwarder: Arc<RecordingForwarder>) -> AppState {
    AppState::from_config(config).unwrap().with_forwarder(forwarder)
}

pub fn client_addr(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, last_octet], 40000))
}

pub fn req(method: Method, uri: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri)
}

pub fn empty(method: Method, uri: &str) -> Request<Body> {
    req(method, uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Start a target that echoes method, selected headers and body as JSON,
/// plus a few fixed routes. Returns its address.
pub async fn start_echo_target() -> SocketAddr {
    async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Value> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| Value::String(v.to_string()))
                .unwrap_or(Value::Null)
        };
        let body = serde_json::from_slice::<Value>(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));
        Json(json!({
            "method": method.as_str(),
            "headers": {
                "authorization": header("authorization"),
                "content-type": header("content-type"),
                "cookie": header("cookie"),
                "language": header("language"),
                "origin": header("origin"),
            },
            "body": body,
        }))
    }

    let app = Router::new()
        .route("/echo", any(echo))
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, Json(json!({ "x": "y" }))).into_response() }),
        )
        .route("/text", get(|| async { "plain words" }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Run the real proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    (addr, shutdown)
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Percent-encode a target URL for the `url` query parameter.
pub fn encode(target: &str) -> String {
    url::form_urlencoded::byte_serialize(target.as_bytes()).collect()
}

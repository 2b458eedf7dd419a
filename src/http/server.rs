//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, rate limit, access policy)
//! - Run the forwarding pipeline for `/proxy`
//! - Serve with graceful shutdown
//!
//! # Middleware order (outermost first)
//! ```text
//! SetRequestId → Trace → PropagateRequestId → rate limit → access policy → handler
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::StartupError;
use crate::forwarding::{Forwarder, HttpForwarder, OutboundOutcome, RequestTranslator};
use crate::http::request::InboundRequest;
use crate::http::response::relay;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::security::access_control::access_policy_middleware;
use crate::security::rate_limit::rate_limit_middleware;
use crate::security::{AccessPolicy, FixedWindowLimiter, RateLimiter};

/// Body of `GET /`.
pub const LIVENESS_MESSAGE: &str = "Dynamic CORS proxy server is running.";

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    /// `None` disables rate limiting.
    pub limiter: Option<Arc<dyn RateLimiter>>,
    pub access: Arc<AccessPolicy>,
    pub translator: Arc<RequestTranslator>,
    pub forwarder: Arc<dyn Forwarder>,
    pub max_body_bytes: usize,
    pub sanitize_payloads: bool,
    pub trust_forwarded_for: bool,
}

impl AppState {
    /// Build the production state: in-memory limiter and a `reqwest` forwarder.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, StartupError> {
        let translator = RequestTranslator::from_config(&config.forwarding)?;
        let forwarder = HttpForwarder::from_config(&config.forwarding)?;
        let access = AccessPolicy::from_config(&config.cors);

        if access.is_permissive_with_credentials() {
            tracing::warn!(
                "CORS echoes every request origin with credentials allowed; \
                 set cors.allowed_origins to restrict callers"
            );
        }

        let limiter: Option<Arc<dyn RateLimiter>> = if config.rate_limit.enabled {
            Some(Arc::new(FixedWindowLimiter::from_config(&config.rate_limit)))
        } else {
            None
        };

        Ok(Self {
            limiter,
            access: Arc::new(access),
            translator: Arc::new(translator),
            forwarder: Arc::new(forwarder),
            max_body_bytes: config.listener.max_body_bytes,
            sanitize_payloads: config.forwarding.sanitize_payloads,
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
        })
    }

    /// Replace the forwarder (e.g. with a test double).
    pub fn with_forwarder(mut self, forwarder: Arc<dyn Forwarder>) -> Self {
        self.forwarder = forwarder;
        self
    }

    /// Replace the rate limiter, or disable it with `None`.
    pub fn with_limiter(mut self, limiter: Option<Arc<dyn RateLimiter>>) -> Self {
        self.limiter = limiter;
        self
    }
}

/// HTTP server for the forwarding proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let state = AppState::from_config(&config)?;
        Ok(Self::with_state(config, state))
    }

    /// Create a server around an already-built state.
    pub fn with_state(config: ProxyConfig, state: AppState) -> Self {
        let router = build_router(state.clone());
        Self {
            router,
            state,
            config,
        }
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server until `shutdown` is triggered, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(limiter) = self.state.limiter.clone() {
            spawn_sweeper(limiter, shutdown.subscribe());
        }

        let mut stop = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/proxy", any(proxy_handler))
        .route("/proxy/{*rest}", any(proxy_handler))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), access_policy_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %request_id
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

/// Translate, forward and relay one request.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();

    let inbound = match InboundRequest::from_request(request, state.max_body_bytes).await {
        Ok(inbound) if state.sanitize_payloads => inbound.sanitized(),
        Ok(inbound) => inbound,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected request body");
            return e.into_response();
        }
    };

    let outbound = match state.translator.translate(&inbound) {
        Ok(outbound) => outbound,
        Err(e) => {
            tracing::debug!(error = %e, "Request not forwarded");
            return e.into_response();
        }
    };

    let method = outbound.method.to_string();
    let url = outbound.url.clone();
    tracing::debug!(method = %method, url = %url, "Forwarding request");

    let outcome = state.forwarder.execute(outbound).await;
    match &outcome {
        OutboundOutcome::Success { status, .. } => {
            tracing::debug!(url = %url, status = %status, "Target responded");
        }
        OutboundOutcome::Failure { status, message, .. } => {
            tracing::error!(url = %url, status = ?status, error = %message, "Forwarding failed");
            metrics::record_forward_failure();
        }
    }

    let response = relay(outcome);
    metrics::record_request(&method, response.status().as_u16(), start_time);
    response
}

/// Periodically evict elapsed rate-limit windows until shutdown.
fn spawn_sweeper(limiter: Arc<dyn RateLimiter>, mut shutdown: broadcast::Receiver<()>) {
    let period = limiter.window();
    if period.is_zero() {
        return;
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => limiter.sweep(Instant::now()),
                _ = shutdown.recv() => break,
            }
        }
    });
}

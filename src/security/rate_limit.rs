//! Per-client fixed-window rate limiting.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::error::ProxyError;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Admission control keyed by client identity.
///
/// Injected into [`AppState`] so the in-memory store can be replaced by a
/// shared one without touching the middleware.
pub trait RateLimiter: Send + Sync {
    /// Record a request from `client` at `now`. Returns false when the
    /// client has used up its quota for the current window.
    fn admit(&self, client: &str, now: Instant) -> bool;

    /// Drop state that can no longer affect admission.
    fn sweep(&self, _now: Instant) {}

    /// Window length, used to schedule sweeps.
    fn window(&self) -> Duration;
}

/// Counter state for one client.
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// In-memory fixed-window limiter.
///
/// Each client's window opens on its first request and resets once the
/// configured duration has elapsed. Updates to one key are serialized by
/// the map's shard lock; distinct clients never contend on a global lock.
pub struct FixedWindowLimiter {
    windows: DashMap<String, Window>,
    window: Duration,
    max_requests: u32,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_requests,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(Duration::from_secs(config.window_secs), config.max_requests)
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn admit(&self, client: &str, now: Instant) -> bool {
        let mut entry = self
            .windows
            .entry(client.to_string())
            .or_insert(Window { started: now, count: 0 });

        if now.saturating_duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }

    fn sweep(&self, now: Instant) {
        let window = self.window;
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < window);
    }

    fn window(&self) -> Duration {
        self.window
    }
}

/// Identify the client for rate limiting.
pub fn client_key(addr: &SocketAddr, headers: &HeaderMap, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    addr.ip().to_string()
}

/// Middleware rejecting clients over their window quota.
///
/// Runs ahead of the access gate; the rejection still carries the
/// access-control headers so browsers can read it.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(limiter) = state.limiter.as_ref() else {
        return next.run(request).await;
    };

    let key = client_key(&addr, request.headers(), state.trust_forwarded_for);
    if limiter.admit(&key, Instant::now()) {
        return next.run(request).await;
    }

    tracing::warn!(client = %key, "Rate limit exceeded");
    metrics::record_rate_limited();

    let decision = state.access.evaluate(
        request.headers().get(axum::http::header::ORIGIN),
        request
            .headers()
            .get(axum::http::header::ACCESS_CONTROL_REQUEST_HEADERS),
        request.method(),
    );
    let mut response = ProxyError::RateLimited.into_response();
    decision.apply(response.headers_mut());
    response
}

//! Dynamic CORS forwarding proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Caller ── GET|POST|... /proxy?url=<target> ──▶ ┌──────────────────────────────┐
//!                                                    │ rate limit (per client IP)   │── 429
//!                                                    │ access policy (CORS)         │── OPTIONS → 200
//!                                                    │ translator (url, headers)    │── 400
//!                                                    │ executor (reqwest)           │──────▶ Target
//!     Caller ◀── status + JSON body ──────────────── │ relay                        │◀────── Target
//!                                                    └──────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use cors_forward_proxy::config::loader::{ensure_valid, load_config};
use cors_forward_proxy::config::{AllowedHeadersMode, ProxyConfig};
use cors_forward_proxy::lifecycle::signals::spawn_signal_listener;
use cors_forward_proxy::observability::{logging, metrics};
use cors_forward_proxy::{HttpServer, Shutdown, StartupError};

#[derive(Parser, Debug)]
#[command(name = "cors-forward-proxy")]
#[command(about = "Forward requests to a caller-supplied URL with CORS headers and rate limiting", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port, keeping the configured host.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Maximum requests per client per window.
    #[arg(long, env = "RATE_LIMIT_MAX")]
    rate_limit_max: Option<u32>,

    /// Rate-limit window length in seconds.
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS")]
    rate_limit_window_secs: Option<u64>,

    /// Allow any request header in preflight responses.
    #[arg(long, env = "CORS_ALLOW_ANY_HEADER")]
    allow_any_header: bool,

    /// Strip markup from textual payload fields before forwarding.
    #[arg(long, env = "SANITIZE_PAYLOADS")]
    sanitize: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ProxyConfig) {
        if let Some(port) = self.port {
            config.listener.set_port(port);
        }
        if let Some(max) = self.rate_limit_max {
            config.rate_limit.max_requests = max;
        }
        if let Some(secs) = self.rate_limit_window_secs {
            config.rate_limit.window_secs = secs;
        }
        if self.allow_any_header {
            config.cors.allowed_headers = AllowedHeadersMode::Any;
        }
        if self.sanitize {
            config.forwarding.sanitize_payloads = true;
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!(error = %e, "Startup failed");
        eprintln!("cors-forward-proxy: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    cli.apply_overrides(&mut config);
    ensure_valid(&config)?;

    logging::init(&config.observability);
    tracing::info!("cors-forward-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limit_enabled = config.rate_limit.enabled,
        window_secs = config.rate_limit.window_secs,
        max_requests = config.rate_limit.max_requests,
        allowed_headers = ?config.cors.allowed_headers,
        sanitize_payloads = config.forwarding.sanitize_payloads,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validated above.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let server = HttpServer::new(config)?;
    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(&shutdown);
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

//! Dynamic CORS forwarding proxy library.

pub mod config;
pub mod error;
pub mod forwarding;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::ProxyConfig;
pub use error::{ProxyError, StartupError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;

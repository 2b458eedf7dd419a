//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → CLI / environment overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → consumed once when building AppState
//! ```
//!
//! # Design Decisions
//! - All fields have defaults; no file at all is a valid configuration
//! - Secrets are never stored in the file, only the name of the variable holding them
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{
    AllowedHeadersMode, CorsConfig, CredentialConfig, ForwardingConfig, ListenerConfig,
    LogFormat, ObservabilityConfig, ProxyConfig, RateLimitConfig,
};

//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → translator.rs (target URL, method, minimal headers, body)
//!     → OutboundRequest
//!     → executor.rs (single attempt against the target)
//!     → OutboundOutcome (Success | Failure)
//!     → http/response.rs relays it to the caller
//! ```
//!
//! # Design Decisions
//! - Any caller-supplied URL is attempted; there is no allow-list
//! - Non-2xx target responses are successes and pass through unchanged
//! - No retries and no timeout beyond the configured client default

pub mod executor;
pub mod translator;

pub use executor::{Forwarder, HttpForwarder, OutboundOutcome};
pub use translator::{CredentialPolicy, OutboundRequest, RequestTranslator};

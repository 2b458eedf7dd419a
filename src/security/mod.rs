//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client window quota, 429 on excess)
//!     → access_control.rs (CORS decision, preflight short-circuit)
//!     → Pass to forwarding handler
//!         → sanitize.rs (optional markup stripping of the body)
//! ```
//!
//! # Design Decisions
//! - Limiter state is an injected trait object, not a global
//! - Access headers are attached to every response, rejections included
//! - Sanitization is opt-in and best effort

pub mod access_control;
pub mod rate_limit;
pub mod sanitize;

pub use access_control::{AccessDecision, AccessPolicy, OriginPolicy};
pub use rate_limit::{FixedWindowLimiter, RateLimiter};

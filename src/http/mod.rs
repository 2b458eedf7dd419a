//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, routing)
//!     → [security: rate limit, access policy]
//!     → request.rs (buffer body, decode query → InboundRequest)
//!     → [forwarding: translate, execute]
//!     → response.rs (relay outcome as JSON)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::InboundRequest;
pub use response::relay;
pub use server::{build_router, AppState, HttpServer};

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, gateway handler)
//!     → request.rs (request ID)
//!     → [auth layer decides: forward / redirect / delegate]
//!     → forward.rs (header rewrite, backend round trip)
//!     → response.rs (gateway-generated redirects)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{Forwarder, ForwardingAdapter, HttpForwarder};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;

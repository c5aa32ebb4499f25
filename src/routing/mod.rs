//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! RouteConfig (at startup)
//!     → route.rs (parse backend target, freeze as Route)
//!
//! Incoming request head (path)
//!     → matcher.rs (exact / extension conditions)
//!     → consumed by the request classifier
//! ```
//!
//! # Design Decisions
//! - Exactly one route per process, compiled at startup
//! - Deterministic: same input always matches the same way

pub mod matcher;
pub mod route;

pub use matcher::{ExactPathMatcher, ExtensionMatcher, Matcher};
pub use route::{BackendTarget, Route, TargetError};

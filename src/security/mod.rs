//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted request:
//!     → headers.rs (strip hop-by-hop and client identity, add X-Forwarded-For,
//!                   set gateway identity)
//!     → Pass to forwarder
//! ```
//!
//! # Design Decisions
//! - No trust in client-supplied identity headers
//! - Fail closed: a user id that cannot be encoded stops the forward

pub mod headers;

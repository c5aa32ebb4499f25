//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Request head
//!     → classifier.rs (exempt / static / ticket callback / default)
//!     → admission.rs (session check, ticket redemption, decision)
//!         ↔ session.rs (encrypted cookie session)
//!         ↔ cas.rs (CAS login/validate/logout)
//!     → Admission handed to the HTTP layer
//! ```
//!
//! # Design Decisions
//! - Session and SSO access sit behind traits so the decision logic is testable
//! - A valid ticket is the only way a session becomes authenticated
//! - Soft failures never surface as errors to the client

pub mod admission;
pub mod cas;
pub mod classifier;
pub mod session;

pub use admission::{Admission, ForwardPlan, Gatekeeper, Logout};
pub use cas::{CasClient, TicketClient, TicketError, UserInfo};
pub use classifier::{Classifier, RequestCategory, HEALTH_PATH, LOGOUT_PATH};
pub use session::{CookieSessionStore, Session, SessionError, SessionStore, SessionUser};

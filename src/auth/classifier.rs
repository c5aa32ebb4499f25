//! Request classification.
//!
//! Every request is assigned exactly one category before any session or SSO
//! work happens. Classification is pure: it reads the request head only.

use axum::http::request::Parts;

use crate::auth::cas::TicketClient;
use crate::routing::{ExactPathMatcher, ExtensionMatcher, Matcher};

pub const HEALTH_PATH: &str = "/health";
pub const LOGOUT_PATH: &str = "/logout";

/// File extensions served without authentication.
pub const STATIC_EXTENSIONS: [&str; 14] = [
    "ico", "jpg", "jpeg", "png", "gif", "svg", "js", "css", "swf", "eot", "ttf", "otf", "woff",
    "woff2",
];

/// Category of an inbound request, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestCategory {
    /// Health check or logout; handled by the gateway itself.
    Exempt,
    /// Static asset; forwarded without authentication.
    StaticAsset,
    /// Return from the SSO login page carrying a ticket.
    TicketCallback,
    /// Everything else; requires a session.
    Default,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    exempt: ExactPathMatcher,
    static_assets: ExtensionMatcher,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            exempt: ExactPathMatcher::new([HEALTH_PATH, LOGOUT_PATH]),
            static_assets: ExtensionMatcher::new(STATIC_EXTENSIONS),
        }
    }
}

impl Classifier {
    /// First match wins: exempt, static asset, ticket callback, default.
    pub fn classify(&self, req: &Parts, tickets: &dyn TicketClient) -> RequestCategory {
        if self.exempt.matches(req) {
            RequestCategory::Exempt
        } else if self.static_assets.matches(req) {
            RequestCategory::StaticAsset
        } else if tickets.is_callback(&req.uri) {
            RequestCategory::TicketCallback
        } else {
            RequestCategory::Default
        }
    }
}

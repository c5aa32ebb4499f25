//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn validated configuration into running collaborators
//! - Wire the admission state machine and forwarder
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - A missing route is tolerated here; requests then get 404

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{CasClient, CookieSessionStore, Gatekeeper, SessionError, TicketError};
use crate::config::GatewayConfig;
use crate::http::forward::{ForwardingAdapter, HttpForwarder};
use crate::routing::{Route, TargetError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid route: {0}")]
    Route(#[from] TargetError),
    #[error("failed to create CAS client: {0}")]
    Cas(#[from] TicketError),
    #[error("failed to create session store: {0}")]
    Session(#[from] SessionError),
}

/// Build the admission state machine from configuration.
pub fn build_gatekeeper(config: &GatewayConfig) -> Result<Gatekeeper, StartupError> {
    let route = config.route.as_ref().map(Route::from_config).transpose()?;
    match &route {
        Some(route) => tracing::info!(
            route = %route.name,
            path = %route.path_prefix,
            target = %route.target,
            "Route configured"
        ),
        None => tracing::warn!("No route configured; all gated requests will return 404"),
    }

    let tickets = CasClient::new(&config.cas)?;
    let sessions = CookieSessionStore::from_config(&config.session)?;
    tracing::info!(
        cas = %config.cas.base_url,
        cookie = %sessions.cookie_name(),
        "Authentication configured"
    );

    Ok(Gatekeeper::new(route, Arc::new(tickets), Arc::new(sessions)))
}

/// Build the forwarding adapter backed by the HTTP forwarder.
pub fn build_forwarding(config: &GatewayConfig) -> ForwardingAdapter {
    let forwarder = HttpForwarder::new(Duration::from_secs(config.timeouts.connect_secs));
    ForwardingAdapter::new(Arc::new(forwarder))
}

//! Request admission.
//!
//! # Responsibilities
//! - Decide, per request, whether to forward, redirect or delegate
//! - Redeem login tickets into authenticated sessions
//! - Build the logout response
//!
//! # Transitions
//! ```text
//! Exempt                      → Delegate
//! no route                    → NotFound
//! StaticAsset                 → Forward (path untouched, no identity)
//! authenticated session       → Forward (prefix stripped, identity headers)
//! TicketCallback, redeemed    → RedirectAfterAuth (session cookie set)
//! anything else               → RedirectToLogin
//! ```
//!
//! # Design Decisions
//! - One decision function returns an exhaustive `Admission`
//! - Collaborator failures demote to `RedirectToLogin`; only a missing route is a hard failure
//! - No state is kept between requests; the session cookie is the only carrier

use std::sync::Arc;

use axum::http::request::Parts;
use axum::http::HeaderValue;

use crate::auth::cas::{TicketClient, TicketError};
use crate::auth::classifier::{Classifier, RequestCategory};
use crate::auth::session::{Session, SessionError, SessionStore, SessionUser};
use crate::observability::metrics;
use crate::routing::Route;

/// Outcome of admitting one request.
#[derive(Debug)]
pub enum Admission {
    /// Exempt endpoint, handled by the gateway itself.
    Delegate,
    /// No route is configured.
    NotFound,
    /// Forward to the backend.
    Forward(ForwardPlan),
    /// Ticket redeemed; set the session cookie and send the user back to the route.
    RedirectAfterAuth {
        location: String,
        set_cookie: HeaderValue,
    },
    /// Send the user to the SSO login page.
    RedirectToLogin { location: String },
}

impl Admission {
    /// Short label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Admission::Delegate => "delegate",
            Admission::NotFound => "not_found",
            Admission::Forward(plan) if plan.identity.is_some() => "forward_authenticated",
            Admission::Forward(_) => "forward_static",
            Admission::RedirectAfterAuth { .. } => "login_success",
            Admission::RedirectToLogin { .. } => "redirect_login",
        }
    }
}

/// How an admitted request reaches the backend.
#[derive(Debug, Clone)]
pub struct ForwardPlan {
    pub route: Arc<Route>,
    /// Path to request from the backend.
    pub path: String,
    /// Identity to assert via headers; `None` for static assets.
    pub identity: Option<SessionUser>,
}

/// Response parts for a logout.
#[derive(Debug)]
pub struct Logout {
    pub location: String,
    pub set_cookie: Option<HeaderValue>,
}

#[derive(Debug, thiserror::Error)]
enum RedeemError {
    #[error(transparent)]
    Ticket(#[from] TicketError),
    #[error("failed to persist session: {0}")]
    Session(#[from] SessionError),
}

/// The admission state machine.
pub struct Gatekeeper {
    route: Option<Arc<Route>>,
    classifier: Classifier,
    tickets: Arc<dyn TicketClient>,
    sessions: Arc<dyn SessionStore>,
}

impl Gatekeeper {
    pub fn new(
        route: Option<Route>,
        tickets: Arc<dyn TicketClient>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            route: route.map(Arc::new),
            classifier: Classifier::default(),
            tickets,
            sessions,
        }
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_deref()
    }

    /// Decide what to do with a request.
    pub async fn admit(&self, req: &Parts) -> Admission {
        let path = req.uri.path();
        let category = self.classifier.classify(req, self.tickets.as_ref());

        if category == RequestCategory::Exempt {
            return Admission::Delegate;
        }

        let Some(route) = self.route.clone() else {
            tracing::warn!(path = %path, "No route configured");
            return Admission::NotFound;
        };

        if category == RequestCategory::StaticAsset {
            tracing::debug!(path = %path, target = %route.target, "Forwarding static asset");
            return Admission::Forward(ForwardPlan {
                path: path.to_string(),
                route,
                identity: None,
            });
        }

        let session = self.sessions.load(&req.headers);
        if let Some(user) = session.user() {
            let forward_path = route.strip_prefix(path);
            tracing::debug!(
                user = %user.user_id,
                path = %path,
                forward_path = %forward_path,
                "Forwarding authenticated request"
            );
            return Admission::Forward(ForwardPlan {
                path: forward_path,
                identity: Some(user.clone()),
                route,
            });
        }

        if category == RequestCategory::TicketCallback {
            match self.redeem_ticket(req, &route, session).await {
                Ok(admission) => return admission,
                Err(e) => tracing::warn!(error = %e, path = %path, "Ticket redemption failed"),
            }
        }

        let service_url = self.tickets.build_service_url(req, route.service_path());
        let location = self.tickets.login_url(&service_url);
        tracing::info!(path = %path, location = %location, "Unauthenticated, redirecting to login");
        Admission::RedirectToLogin { location }
    }

    async fn redeem_ticket(
        &self,
        req: &Parts,
        route: &Route,
        mut session: Session,
    ) -> Result<Admission, RedeemError> {
        let ticket = self.tickets.extract_ticket(&req.uri)?;
        let service_url = self.tickets.build_service_url(req, route.service_path());

        let info = match self.tickets.validate(&ticket, &service_url).await {
            Ok(info) => {
                metrics::record_ticket_validation("success");
                info
            }
            Err(e) => {
                metrics::record_ticket_validation("failure");
                return Err(e.into());
            }
        };

        session.authenticate(info);
        let set_cookie = self.sessions.save(&session)?;

        let location = route.post_login_location().to_string();
        if let Some(user) = session.user() {
            tracing::info!(user = %user.user_id, location = %location, "Login succeeded");
        }
        Ok(Admission::RedirectAfterAuth {
            location,
            set_cookie,
        })
    }

    /// Expire the session and send the user to the SSO logout page.
    pub fn logout(&self, req: &Parts) -> Logout {
        let route_path = self.route().map_or("/", Route::service_path);
        let service_url = self.tickets.build_service_url(req, route_path);

        let set_cookie = match self.sessions.expire() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to expire session cookie");
                None
            }
        };

        Logout {
            location: self.tickets.logout_url(&service_url),
            set_cookie,
        }
    }
}

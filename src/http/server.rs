//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single gateway handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve the exempt endpoints (`/health`, `/logout`)
//! - Dispatch admitted requests to the forwarder

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::request::Parts;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{Admission, Gatekeeper, HEALTH_PATH, LOGOUT_PATH};
use crate::config::GatewayConfig;
use crate::http::forward::ForwardingAdapter;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::{found, resolve_location};
use crate::lifecycle::startup::{build_forwarding, build_gatekeeper};
use crate::lifecycle::{ShutdownSignal, StartupError};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gatekeeper: Arc<Gatekeeper>,
    pub adapter: ForwardingAdapter,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self, StartupError> {
        let gatekeeper = build_gatekeeper(config)?;
        let adapter = build_forwarding(config);
        Ok(Self::with_collaborators(config, gatekeeper, adapter))
    }

    /// Create a server around already-built collaborators.
    pub fn with_collaborators(
        config: &GatewayConfig,
        gatekeeper: Gatekeeper,
        adapter: ForwardingAdapter,
    ) -> Self {
        let state = AppState {
            gatekeeper: Arc::new(gatekeeper),
            adapter,
        };
        let router = Self::build_router(Duration::from_secs(config.timeouts.request_secs), state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(request_timeout: Duration, state: AppState) -> Router {
        Router::new()
            .fallback(gateway_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The router, for driving the server without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.recv())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main gateway handler.
/// Admits the request, then forwards, redirects or answers it directly.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();
    let req_id = request_id(&parts.headers).to_string();

    let admission = state.gatekeeper.admit(&parts).await;
    let outcome = admission.outcome();

    tracing::debug!(
        request_id = %req_id,
        method = %parts.method,
        path = %parts.uri.path(),
        outcome,
        "Request admitted"
    );

    let response = match admission {
        Admission::Delegate => exempt_response(&state, &parts),
        Admission::NotFound => {
            tracing::warn!(request_id = %req_id, path = %parts.uri.path(), "No route configured");
            (StatusCode::NOT_FOUND, "No route configured").into_response()
        }
        Admission::Forward(plan) => {
            let client = parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr);
            let request = Request::from_parts(parts, body);
            state.adapter.dispatch(request, &plan, client).await
        }
        Admission::RedirectAfterAuth {
            location,
            set_cookie,
        } => found(&resolve_location(&location, parts.uri.path()), Some(set_cookie)),
        Admission::RedirectToLogin { location } => found(&location, None),
    };

    metrics::record_request(outcome, response.status().as_u16(), start_time);
    response
}

/// Responses for the endpoints the gateway serves itself.
fn exempt_response(state: &AppState, parts: &Parts) -> Response {
    match parts.uri.path() {
        HEALTH_PATH => match parts.method {
            Method::GET | Method::HEAD => (StatusCode::OK, "OK").into_response(),
            _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        },
        LOGOUT_PATH => match parts.method {
            Method::GET | Method::POST => {
                let logout = state.gatekeeper.logout(parts);
                found(&logout.location, logout.set_cookie)
            }
            _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        },
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

//! Forwarding admitted requests to the backend.
//!
//! # Responsibilities
//! - Apply the forward plan (path rewrite, identity headers)
//! - Rewrite the URI onto the backend target
//! - Stream request and response bodies through unchanged
//!
//! # Design Decisions
//! - Bodies are never buffered
//! - Backend status codes and bodies are passed back verbatim
//! - Transport failures map to 502 Bad Gateway
//! - A plan whose identity cannot be encoded is never forwarded

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::InvalidHeaderValue;
use axum::http::uri::PathAndQuery;
use axum::http::{Request, StatusCode, Uri, Version};
use axum::response::{IntoResponse, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::auth::ForwardPlan;
use crate::http::request::request_id;
use crate::observability::metrics;
use crate::routing::BackendTarget;
use crate::security::headers;

/// Sends a request to the backend and returns its response.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: Request<Body>, target: &BackendTarget) -> Response;
}

/// Forwarder backed by a pooled hyper client.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
}

impl HttpForwarder {
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, request: Request<Body>, target: &BackendTarget) -> Response {
        let (mut parts, body) = request.into_parts();
        let req_id = request_id(&parts.headers).to_string();

        parts.uri = match target.uri_for(parts.uri.path(), parts.uri.query()) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(request_id = %req_id, error = %e, "Failed to build backend URI");
                return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
            }
        };
        parts.version = Version::HTTP_11;

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => {
                let (mut parts, body) = response.into_parts();
                headers::strip_hop_by_hop(&mut parts.headers);
                metrics::record_backend_response(parts.status.as_u16());
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(request_id = %req_id, target = %target, error = %e, "Upstream error");
                metrics::record_backend_response(StatusCode::BAD_GATEWAY.as_u16());
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("user id cannot be sent as a header: {0}")]
    Identity(#[from] InvalidHeaderValue),
}

/// Applies a [`ForwardPlan`] and hands the request to the forwarder.
#[derive(Clone)]
pub struct ForwardingAdapter {
    forwarder: Arc<dyn Forwarder>,
}

impl ForwardingAdapter {
    pub fn new(forwarder: Arc<dyn Forwarder>) -> Self {
        Self { forwarder }
    }

    pub async fn dispatch(
        &self,
        request: Request<Body>,
        plan: &ForwardPlan,
        client: Option<SocketAddr>,
    ) -> Response {
        match prepare_request(request, plan, client) {
            Ok(request) => self.forwarder.forward(request, &plan.route.target).await,
            Err(e) => {
                tracing::error!(error = %e, path = %plan.path, "Refusing to forward request");
                (StatusCode::INTERNAL_SERVER_ERROR, "Identity cannot be forwarded").into_response()
            }
        }
    }
}

/// Rewrite headers and path according to the plan.
pub fn prepare_request(
    request: Request<Body>,
    plan: &ForwardPlan,
    client: Option<SocketAddr>,
) -> Result<Request<Body>, ForwardError> {
    let (mut parts, body) = request.into_parts();

    headers::strip_hop_by_hop(&mut parts.headers);
    headers::strip_identity(&mut parts.headers);
    if let Some(addr) = client {
        headers::append_forwarded_for(&mut parts.headers, addr.ip());
    }
    if let Some(user) = &plan.identity {
        headers::set_identity(&mut parts.headers, user)?;
    }

    if parts.uri.path() != plan.path {
        let path_and_query = match parts.uri.query() {
            Some(query) => format!("{}?{}", plan.path, query),
            None => plan.path.clone(),
        };
        match PathAndQuery::try_from(path_and_query) {
            Ok(pq) => {
                let mut uri_parts = parts.uri.clone().into_parts();
                uri_parts.path_and_query = Some(pq);
                match Uri::from_parts(uri_parts) {
                    Ok(uri) => parts.uri = uri,
                    Err(e) => {
                        tracing::warn!(path = %plan.path, error = %e, "Keeping original path")
                    }
                }
            }
            Err(e) => tracing::warn!(path = %plan.path, error = %e, "Keeping original path"),
        }
    }

    Ok(Request::from_parts(parts, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionUser;
    use crate::routing::Route;
    use crate::security::headers::{X_EMPLOYEE_NAME, X_FORWARDED_FOR, X_USER};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn plan(path: &str, identity: Option<SessionUser>) -> ForwardPlan {
        ForwardPlan {
            route: Arc::new(Route::new(
                "test",
                "/app",
                BackendTarget::parse("127.0.0.1:3000").unwrap(),
            )),
            path: path.to_string(),
            identity,
        }
    }

    fn request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-user", "forged")
            .header("x-employee-name", "Forged")
            .header("connection", "close")
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_authenticated_request_rewrite() {
        let identity = SessionUser {
            user_id: "u1".into(),
            display_name: Some("Alice".into()),
        };
        let req = prepare_request(
            request("/app/foo?x=1"),
            &plan("/foo", Some(identity)),
            Some("192.0.2.7:5000".parse().unwrap()),
        )
        .unwrap();

        assert_eq!(req.uri().path(), "/foo");
        assert_eq!(req.uri().query(), Some("x=1"));
        assert_eq!(req.headers()[&X_USER], "u1");
        assert_eq!(req.headers()[&X_EMPLOYEE_NAME], "Alice");
        assert_eq!(req.headers()[&X_FORWARDED_FOR], "192.0.2.7");
        assert!(!req.headers().contains_key("connection"));
    }

    #[test]
    fn test_static_request_keeps_path_and_drops_identity() {
        let req =
            prepare_request(request("/app/site.css"), &plan("/app/site.css", None), None).unwrap();

        assert_eq!(req.uri().path(), "/app/site.css");
        assert!(!req.headers().contains_key(&X_USER));
        assert!(!req.headers().contains_key(&X_EMPLOYEE_NAME));
    }

    /// Forwarder counting how often it is reached.
    #[derive(Default)]
    struct CountingForwarder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Forwarder for CountingForwarder {
        async fn forward(&self, _request: Request<Body>, _target: &BackendTarget) -> Response {
            self.calls.fetch_add(1, Ordering::SeqCst);
            StatusCode::OK.into_response()
        }
    }

    #[tokio::test]
    async fn test_unencodable_identity_is_not_forwarded() {
        let identity = SessionUser {
            user_id: "u1\u{7f}".into(),
            display_name: None,
        };
        let plan = plan("/foo", Some(identity));
        assert!(matches!(
            prepare_request(request("/app/foo"), &plan, None),
            Err(ForwardError::Identity(_))
        ));

        let forwarder = Arc::new(CountingForwarder::default());
        let adapter = ForwardingAdapter::new(forwarder.clone());
        let response = adapter.dispatch(request("/app/foo"), &plan, None).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(forwarder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_segment_mismatch_keeps_full_path() {
        let route = Route::new("test", "/app", BackendTarget::parse("127.0.0.1:3000").unwrap());
        let forward_path = route.strip_prefix("/apple");
        let req = prepare_request(request("/apple?x=1"), &plan(&forward_path, None), None).unwrap();

        assert_eq!(req.uri().path(), "/apple");
        assert_eq!(req.uri().query(), Some("x=1"));
    }
}

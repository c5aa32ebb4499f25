//! Gateway-generated responses.
//!
//! # Responsibilities
//! - Build `302 Found` redirects, optionally setting a cookie
//! - Resolve relative redirect targets against the request path
//!
//! # Design Decisions
//! - Redirects always use 302 for compatibility with existing clients
//! - An empty location resolves to the request's directory ("/" at the root)

use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Resolve `location` the way a browser would against `request_path`:
/// absolute URLs and absolute paths are kept, anything else is joined to the
/// request path's directory.
pub fn resolve_location(location: &str, request_path: &str) -> String {
    if location.starts_with('/') || location.contains("://") {
        return location.to_string();
    }
    let dir = match request_path.rfind('/') {
        Some(idx) => &request_path[..=idx],
        None => "/",
    };
    format!("{dir}{location}")
}

/// `302 Found` to `location`.
pub fn found(location: &str, set_cookie: Option<HeaderValue>) -> Response {
    let location = match HeaderValue::from_str(location) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "Redirect location is not a valid header value");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response = StatusCode::FOUND.into_response();
    response.headers_mut().insert(LOCATION, location);
    if let Some(cookie) = set_cookie {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

//! Header manipulation for forwarded traffic.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Append the client address to X-Forwarded-For
//! - Remove client-supplied identity headers and set the gateway's own
//!
//! # Design Decisions
//! - Only the gateway asserts identity: incoming X-User / X-Employee-Name are always dropped
//! - Identity values are sent as raw bytes; non-ASCII display names pass through

use std::net::IpAddr;

use axum::http::header::{HeaderName, HeaderValue, InvalidHeaderValue, CONNECTION};
use axum::http::HeaderMap;

use crate::auth::SessionUser;

pub const X_USER: HeaderName = HeaderName::from_static("x-user");
pub const X_EMPLOYEE_NAME: HeaderName = HeaderName::from_static("x-employee-name");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Append `client` to X-Forwarded-For, keeping earlier hops.
pub fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) if !prior.is_empty() => format!("{prior}, {client}"),
        _ => client.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Drop identity headers a client may have sent.
pub fn strip_identity(headers: &mut HeaderMap) {
    headers.remove(X_USER);
    headers.remove(X_EMPLOYEE_NAME);
}

/// Whether `value` can be carried in an identity header.
pub fn is_valid_identity(value: &str) -> bool {
    HeaderValue::from_bytes(value.as_bytes()).is_ok()
}

/// Assert the session identity to the backend. An unencodable user id is an
/// error and leaves no identity headers behind; an unencodable display name
/// is only dropped.
pub fn set_identity(headers: &mut HeaderMap, user: &SessionUser) -> Result<(), InvalidHeaderValue> {
    strip_identity(headers);

    let user_id = HeaderValue::from_bytes(user.user_id.as_bytes())?;
    headers.insert(X_USER, user_id);

    if let Some(name) = &user.display_name {
        match HeaderValue::from_bytes(name.as_bytes()) {
            Ok(value) => {
                headers.insert(X_EMPLOYEE_NAME, value);
            }
            Err(_) => tracing::warn!(user = %user.user_id, "Display name is not a valid header value"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive, x-private"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-private", HeaderValue::from_static("1"));
        headers.insert("upgrade", HeaderValue::from_static("h2c"));
        headers.insert("accept", HeaderValue::from_static("*/*"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key("accept"));
    }

    #[test]
    fn test_append_forwarded_for() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "10.0.0.1".parse().unwrap());
        assert_eq!(headers[&X_FORWARDED_FOR], "10.0.0.1");

        append_forwarded_for(&mut headers, "10.0.0.2".parse().unwrap());
        assert_eq!(headers[&X_FORWARDED_FOR], "10.0.0.1, 10.0.0.2");
    }

    #[test]
    fn test_identity_replaces_client_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(X_USER, HeaderValue::from_static("admin"));
        headers.insert(X_EMPLOYEE_NAME, HeaderValue::from_static("Mallory"));

        set_identity(
            &mut headers,
            &SessionUser {
                user_id: "u1".into(),
                display_name: Some("张三".into()),
            },
        )
        .unwrap();

        assert_eq!(headers[&X_USER], "u1");
        assert_eq!(headers[&X_EMPLOYEE_NAME].as_bytes(), "张三".as_bytes());
    }

    #[test]
    fn test_identity_without_display_name() {
        let mut headers = HeaderMap::new();
        headers.insert(X_EMPLOYEE_NAME, HeaderValue::from_static("Mallory"));

        set_identity(
            &mut headers,
            &SessionUser {
                user_id: "u1".into(),
                display_name: None,
            },
        )
        .unwrap();

        assert_eq!(headers[&X_USER], "u1");
        assert!(!headers.contains_key(&X_EMPLOYEE_NAME));
    }

    #[test]
    fn test_unencodable_user_id_sets_no_identity() {
        let mut headers = HeaderMap::new();
        headers.insert(X_USER, HeaderValue::from_static("admin"));

        let result = set_identity(
            &mut headers,
            &SessionUser {
                user_id: "u1\u{7f}".into(),
                display_name: Some("Alice".into()),
            },
        );

        assert!(result.is_err());
        assert!(!headers.contains_key(&X_USER));
        assert!(!headers.contains_key(&X_EMPLOYEE_NAME));
        assert!(!is_valid_identity("u1\r\n"));
        assert!(is_valid_identity("u1"));
    }
}

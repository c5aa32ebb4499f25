//! Configuration validation.
//!
//! Semantic checks that serde cannot express. All errors are collected so a
//! broken config file is reported in one pass.

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::GatewayConfig;

/// Minimum length of the session secret (cookie key material).
pub const MIN_SECRET_LEN: usize = 64;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, returning every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if let Some(secret) = &config.session.secret {
        if secret.len() < MIN_SECRET_LEN {
            errors.push(ValidationError::new(
                "session.secret",
                format!("must be at least {MIN_SECRET_LEN} bytes"),
            ));
        }
    }
    if config.session.cookie_name.is_empty() {
        errors.push(ValidationError::new("session.cookie_name", "must not be empty"));
    }

    match Url::parse(&config.cas.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::new(
            "cas.base_url",
            format!("'{}' is not an absolute http(s) URL", config.cas.base_url),
        )),
    }
    for (field, path) in [
        ("cas.login_path", &config.cas.login_path),
        ("cas.validate_path", &config.cas.validate_path),
        ("cas.logout_path", &config.cas.logout_path),
    ] {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(field, "must start with '/'"));
        }
    }
    if let Some(base) = &config.cas.service_base_url {
        if Url::parse(base).is_err() {
            errors.push(ValidationError::new(
                "cas.service_base_url",
                format!("'{base}' is not an absolute URL"),
            ));
        }
    }
    if config.cas.timeout_secs == 0 {
        errors.push(ValidationError::new("cas.timeout_secs", "must be greater than 0"));
    }

    match &config.route {
        None => errors.push(ValidationError::new("route", "exactly one route must be configured")),
        Some(route) => {
            if !route.path.is_empty() && !route.path.starts_with('/') {
                errors.push(ValidationError::new("route.path", "must be empty or start with '/'"));
            }
            if let Err(e) = crate::routing::BackendTarget::parse(&route.target) {
                errors.push(ValidationError::new("route.target", e.to_string()));
            }
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

//! The single backend route.
//!
//! # Responsibilities
//! - Hold the gateway mount prefix and backend target
//! - Strip the mount prefix from admitted request paths
//! - Derive the service path used in the CAS exchange
//!
//! # Design Decisions
//! - Immutable after construction (shared without locks)
//! - Backend targets are plain HTTP; TLS towards the backend is not supported

use axum::http::uri::{Authority, InvalidUri, Scheme};
use axum::http::Uri;

use crate::config::RouteConfig;

/// Error type for backend target parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("'{0}' is not a valid backend address: {1}")]
    Invalid(String, String),
    #[error("unsupported backend scheme '{0}', only http is supported")]
    UnsupportedScheme(String),
    #[error("'{0}' has no host")]
    MissingHost(String),
}

/// Parsed backend base address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    authority: Authority,
    base_path: String,
}

impl BackendTarget {
    /// Parse `http://host:port[/base]` or a bare `host:port`.
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        if raw.trim().is_empty() {
            return Err(TargetError::MissingHost(raw.to_string()));
        }
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };
        let uri: Uri = with_scheme
            .parse()
            .map_err(|e: InvalidUri| TargetError::Invalid(raw.to_string(), e.to_string()))?;

        match uri.scheme_str() {
            Some("http") => {}
            other => return Err(TargetError::UnsupportedScheme(other.unwrap_or_default().to_string())),
        }

        let authority = uri
            .authority()
            .filter(|a| !a.host().is_empty())
            .cloned()
            .ok_or_else(|| TargetError::MissingHost(raw.to_string()))?;

        Ok(Self {
            authority,
            base_path: uri.path().trim_end_matches('/').to_string(),
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Build the outbound URI for a request path and query.
    pub fn uri_for(&self, path: &str, query: Option<&str>) -> Result<Uri, axum::http::Error> {
        let mut path_and_query = String::with_capacity(
            self.base_path.len() + path.len() + query.map_or(0, |q| q.len() + 1),
        );
        path_and_query.push_str(&self.base_path);
        path_and_query.push_str(path);
        if let Some(query) = query {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }

        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

impl std::fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "http://{}{}", self.authority, self.base_path)
    }
}

/// The route this gateway admits requests to.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    /// Mount prefix, possibly empty or "/".
    pub path_prefix: String,
    pub target: BackendTarget,
}

impl Route {
    pub fn new(name: impl Into<String>, path_prefix: impl Into<String>, target: BackendTarget) -> Self {
        Self {
            name: name.into(),
            path_prefix: path_prefix.into(),
            target,
        }
    }

    pub fn from_config(config: &RouteConfig) -> Result<Self, TargetError> {
        Ok(Self::new(
            config.name.clone(),
            config.path.clone(),
            BackendTarget::parse(&config.target)?,
        ))
    }

    /// Remove the mount prefix from `path` on a segment boundary. Never
    /// returns an empty or unrooted path.
    pub fn strip_prefix(&self, path: &str) -> String {
        let prefix = self.path_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return path.to_string();
        }
        match path.strip_prefix(prefix) {
            Some("") => "/".to_string(),
            Some(rest) if rest.starts_with('/') => rest.to_string(),
            _ => path.to_string(),
        }
    }

    /// Path presented to the SSO server as part of the service URL.
    pub fn service_path(&self) -> &str {
        if self.path_prefix.is_empty() {
            "/"
        } else {
            &self.path_prefix
        }
    }

    /// Redirect target after a successful login. The root mount is written
    /// as an empty location.
    pub fn post_login_location(&self) -> &str {
        match self.service_path() {
            "/" => "",
            path => path,
        }
    }
}

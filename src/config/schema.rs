//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// CAS single-sign-on server settings.
    pub cas: CasConfig,

    /// The single backend route. Required; absence fails validation.
    pub route: Option<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Secret used to encrypt and authenticate the session cookie.
    /// At least 64 bytes. When unset an ephemeral key is generated and
    /// sessions do not survive a restart.
    pub secret: Option<String>,

    /// Cookie name.
    pub cookie_name: String,

    /// Cookie lifetime in seconds.
    pub max_age_secs: u64,

    /// Mark the cookie `Secure` (only sent over HTTPS).
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            cookie_name: "cas_gateway_session".to_string(),
            max_age_secs: 7 * 24 * 60 * 60,
            secure: false,
        }
    }
}

/// CAS server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CasConfig {
    /// CAS server base URL (e.g., "https://sso.example.com/cas").
    pub base_url: String,

    /// Login page path, relative to `base_url`.
    pub login_path: String,

    /// Ticket validation path, relative to `base_url`.
    pub validate_path: String,

    /// Logout path, relative to `base_url`.
    pub logout_path: String,

    /// Request JSON validation responses (`format=json`) instead of XML.
    pub use_json: bool,

    /// Validation request timeout in seconds.
    pub timeout_secs: u64,

    /// Attribute carrying the user id. `None` uses the CAS `user` element.
    pub user_attribute: Option<String>,

    /// Attribute carrying the display name.
    pub display_name_attribute: String,

    /// Externally visible base URL of the gateway (e.g., "https://app.example.com").
    /// Overrides the scheme and host taken from the request when building
    /// service URLs.
    pub service_base_url: Option<String>,
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            login_path: "/login".to_string(),
            validate_path: "/p3/serviceValidate".to_string(),
            logout_path: "/logout".to_string(),
            use_json: false,
            timeout_secs: 10,
            user_attribute: None,
            display_name_attribute: "employeeName".to_string(),
            service_base_url: None,
        }
    }
}

/// Route configuration mapping the gateway mount point to the backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging.
    #[serde(default = "default_route_name")]
    pub name: String,

    /// Path prefix the gateway is mounted at. May be empty or "/".
    #[serde(default)]
    pub path: String,

    /// Backend base address (e.g., "http://127.0.0.1:3000").
    pub target: String,
}

fn default_route_name() -> String {
    "default".to_string()
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

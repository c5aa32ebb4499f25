//! CAS ticket client.
//!
//! # Responsibilities
//! - Detect login callbacks and extract the service ticket
//! - Build the service URL presented to the CAS server
//! - Build login and logout URLs
//! - Validate tickets against `serviceValidate` (XML or JSON responses)
//!
//! # Design Decisions
//! - The validation round trip is bounded by the client timeout, not by callers
//! - Failure details stay in logs; callers only see a `TicketError`
//! - Tickets are not deduplicated here; single use is enforced by the CAS server

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::header::HOST;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use url::form_urlencoded;

use crate::config::CasConfig;
use crate::security::headers;

/// Query parameter carrying the service ticket on the login callback.
pub const TICKET_PARAM: &str = "ticket";

/// Identity asserted by the CAS server for a validated ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub subject_id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("no ticket in request URL")]
    NotFound,
    #[error("CAS request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("CAS responded with status {0}")]
    Status(reqwest::StatusCode),
    #[error("ticket rejected ({code}): {description}")]
    Rejected { code: String, description: String },
    #[error("malformed CAS response: {0}")]
    Malformed(String),
}

/// SSO operations the admission logic depends on.
#[async_trait]
pub trait TicketClient: Send + Sync {
    /// Whether the URL is a return from the login page.
    fn is_callback(&self, uri: &Uri) -> bool {
        self.extract_ticket(uri).is_ok()
    }

    fn extract_ticket(&self, uri: &Uri) -> Result<String, TicketError>;

    /// Externally visible URL for `route_path`, derived from the request.
    fn build_service_url(&self, req: &Parts, route_path: &str) -> String;

    fn login_url(&self, service_url: &str) -> String;

    fn logout_url(&self, service_url: &str) -> String;

    /// Exchange a ticket for the user's identity.
    async fn validate(&self, ticket: &str, service_url: &str) -> Result<UserInfo, TicketError>;
}

/// Read the non-empty `ticket` query parameter.
pub fn ticket_from_uri(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == TICKET_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// First value of a possibly comma-separated forwarding header.
fn forwarded_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// HTTP client for a CAS server.
#[derive(Debug, Clone)]
pub struct CasClient {
    http: reqwest::Client,
    base_url: String,
    login_path: String,
    validate_path: String,
    logout_path: String,
    use_json: bool,
    user_attribute: Option<String>,
    display_name_attribute: String,
    service_base_url: Option<String>,
}

impl CasClient {
    pub fn new(config: &CasConfig) -> Result<Self, TicketError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login_path: config.login_path.clone(),
            validate_path: config.validate_path.clone(),
            logout_path: config.logout_path.clone(),
            use_json: config.use_json,
            user_attribute: config.user_attribute.clone(),
            display_name_attribute: config.display_name_attribute.clone(),
            service_base_url: config
                .service_base_url
                .as_ref()
                .map(|base| base.trim_end_matches('/').to_string()),
        })
    }

    fn endpoint_with_service(&self, path: &str, service_url: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("service", service_url)
            .finish();
        format!("{}{}?{}", self.base_url, path, query)
    }

    fn user_info(&self, assertion: Assertion) -> Result<UserInfo, TicketError> {
        let Assertion { user, mut attributes } = assertion;
        let subject_id = match &self.user_attribute {
            Some(attr) => attributes.remove(attr).ok_or_else(|| {
                TicketError::Malformed(format!("missing user attribute '{attr}'"))
            })?,
            None => user,
        };
        if subject_id.is_empty() {
            return Err(TicketError::Malformed("empty user".into()));
        }
        if !headers::is_valid_identity(&subject_id) {
            return Err(TicketError::Malformed("user id cannot be sent as a header".into()));
        }

        Ok(UserInfo {
            subject_id,
            display_name: attributes
                .remove(&self.display_name_attribute)
                .filter(|name| !name.is_empty()),
        })
    }
}

#[async_trait]
impl TicketClient for CasClient {
    fn extract_ticket(&self, uri: &Uri) -> Result<String, TicketError> {
        ticket_from_uri(uri).ok_or(TicketError::NotFound)
    }

    fn build_service_url(&self, req: &Parts, route_path: &str) -> String {
        if let Some(base) = &self.service_base_url {
            return format!("{base}{route_path}");
        }

        let scheme = forwarded_value(&req.headers, "x-forwarded-proto")
            .or_else(|| req.uri.scheme_str())
            .unwrap_or("http");
        let host = forwarded_value(&req.headers, "x-forwarded-host")
            .or_else(|| req.headers.get(HOST).and_then(|h| h.to_str().ok()))
            .or_else(|| req.uri.authority().map(|a| a.as_str()))
            .unwrap_or("localhost");

        format!("{scheme}://{host}{route_path}")
    }

    fn login_url(&self, service_url: &str) -> String {
        self.endpoint_with_service(&self.login_path, service_url)
    }

    fn logout_url(&self, service_url: &str) -> String {
        self.endpoint_with_service(&self.logout_path, service_url)
    }

    async fn validate(&self, ticket: &str, service_url: &str) -> Result<UserInfo, TicketError> {
        let mut query = vec![("service", service_url), ("ticket", ticket)];
        if self.use_json {
            query.push(("format", "json"));
        }

        let response = self
            .http
            .get(format!("{}{}", self.base_url, self.validate_path))
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TicketError::Status(status));
        }

        let body = response.text().await?;
        let assertion = if self.use_json {
            parse_json_response(&body)?
        } else {
            parse_xml_response(&body)?
        };
        self.user_info(assertion)
    }
}

/// Successful `serviceValidate` payload before attribute mapping.
#[derive(Debug, Default, PartialEq, Eq)]
struct Assertion {
    user: String,
    /// First value of each attribute.
    attributes: HashMap<String, String>,
}

fn parse_xml_response(body: &str) -> Result<Assertion, TicketError> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut user: Option<String> = None;
    let mut attributes = HashMap::new();
    let mut failure: Option<(String, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "authenticationFailure" {
                    let code = e
                        .try_get_attribute("code")
                        .ok()
                        .flatten()
                        .and_then(|a| a.unescape_value().ok())
                        .map(|v| v.into_owned())
                        .unwrap_or_default();
                    failure = Some((code, String::new()));
                }
                path.push(name);
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| TicketError::Malformed(e.to_string()))?
                    .trim()
                    .to_string();
                if text.is_empty() {
                    continue;
                }
                match path.as_slice() {
                    [.., parent, leaf] if parent == "authenticationSuccess" && leaf == "user" => {
                        user = Some(text);
                    }
                    [.., parent, leaf] if parent == "attributes" => {
                        attributes.entry(leaf.clone()).or_insert(text);
                    }
                    [.., leaf] if leaf == "authenticationFailure" => {
                        if let Some((_, description)) = failure.as_mut() {
                            *description = text;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(TicketError::Malformed(e.to_string())),
            _ => {}
        }
    }

    if let Some((code, description)) = failure {
        return Err(TicketError::Rejected { code, description });
    }
    let user = user.ok_or_else(|| TicketError::Malformed("no authenticationSuccess user".into()))?;
    Ok(Assertion { user, attributes })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonEnvelope {
    service_response: JsonServiceResponse,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonServiceResponse {
    authentication_success: Option<JsonSuccess>,
    authentication_failure: Option<JsonFailure>,
}

#[derive(Deserialize)]
struct JsonSuccess {
    user: String,
    #[serde(default)]
    attributes: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct JsonFailure {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

/// Attribute values arrive as scalars or arrays; the first scalar wins.
fn first_scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Array(values) => values.first().and_then(first_scalar),
        _ => None,
    }
}

fn parse_json_response(body: &str) -> Result<Assertion, TicketError> {
    let envelope: JsonEnvelope =
        serde_json::from_str(body).map_err(|e| TicketError::Malformed(e.to_string()))?;
    let response = envelope.service_response;

    if let Some(failure) = response.authentication_failure {
        return Err(TicketError::Rejected {
            code: failure.code,
            description: failure.description.trim().to_string(),
        });
    }
    let success = response
        .authentication_success
        .ok_or_else(|| TicketError::Malformed("no authenticationSuccess".into()))?;

    Ok(Assertion {
        user: success.user,
        attributes: success
            .attributes
            .iter()
            .filter_map(|(name, value)| first_scalar(value).map(|v| (name.clone(), v)))
            .collect(),
    })
}

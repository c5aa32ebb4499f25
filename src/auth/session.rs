//! Session record and cookie-backed session store.
//!
//! The whole session lives client-side in a single private cookie: the JSON
//! payload is encrypted and authenticated with the gateway key, so a client can
//! neither read nor forge it. Anything that fails to decrypt or parse loads as
//! an empty session.

use axum::http::header::SET_COOKIE;
use axum::http::header::InvalidHeaderValue;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::auth::cas::UserInfo;
use crate::config::SessionConfig;

/// Browsers drop cookies larger than this.
pub const MAX_COOKIE_BYTES: usize = 4096;

/// Identity held by an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: String,
    pub display_name: Option<String>,
}

/// Per-client session. `None` user means unauthenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<SessionUser>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    /// Mark the session authenticated as the validated ticket's subject.
    pub fn authenticate(&mut self, info: UserInfo) {
        self.user = Some(SessionUser {
            user_id: info.subject_id,
            display_name: info.display_name.filter(|n| !n.is_empty()),
        });
    }
}

/// Persisted cookie payload. Key names are shared with other deployments
/// reading the same cookie.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionRecord {
    #[serde(default)]
    authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(rename = "employeeName", default, skip_serializing_if = "Option::is_none")]
    employee_name: Option<String>,
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        match &session.user {
            Some(user) => Self {
                authenticated: true,
                user: Some(user.user_id.clone()),
                employee_name: user.display_name.clone(),
            },
            None => Self::default(),
        }
    }
}

impl From<SessionRecord> for Session {
    fn from(record: SessionRecord) -> Self {
        let user = match (record.authenticated, record.user) {
            (true, Some(user_id)) if !user_id.is_empty() => Some(SessionUser {
                user_id,
                display_name: record.employee_name.filter(|n| !n.is_empty()),
            }),
            _ => None,
        };
        Self { user }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("session cookie is {0} bytes, limit is {MAX_COOKIE_BYTES}")]
    TooLarge(usize),
    #[error("invalid Set-Cookie header: {0}")]
    Header(#[from] InvalidHeaderValue),
    #[error("cookie jar produced no Set-Cookie header")]
    MissingCookie,
    #[error("session secret must be at least 64 bytes")]
    InvalidKey,
}

/// Loads sessions from request headers and renders them as `Set-Cookie`
/// values for the response.
pub trait SessionStore: Send + Sync {
    /// Never fails: a missing, tampered or malformed cookie yields an empty session.
    fn load(&self, headers: &HeaderMap) -> Session;

    /// Render `session` as a `Set-Cookie` header value.
    fn save(&self, session: &Session) -> Result<HeaderValue, SessionError>;

    /// Render a `Set-Cookie` header value that clears the session immediately.
    fn expire(&self) -> Result<HeaderValue, SessionError>;
}

/// Session store keeping the whole session in an encrypted cookie.
#[derive(Clone)]
pub struct CookieSessionStore {
    key: Key,
    cookie_name: String,
    max_age: Duration,
    secure: bool,
}

impl CookieSessionStore {
    pub fn new(key: Key, cookie_name: impl Into<String>, max_age: Duration, secure: bool) -> Self {
        Self {
            key,
            cookie_name: cookie_name.into(),
            max_age,
            secure,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        let key = match &config.secret {
            Some(secret) => Key::try_from(secret.as_bytes()).map_err(|_| SessionError::InvalidKey)?,
            None => {
                tracing::warn!("No session secret configured, using an ephemeral key; sessions will not survive a restart");
                Key::generate()
            }
        };
        let max_age = Duration::seconds(i64::try_from(config.max_age_secs).unwrap_or(i64::MAX));
        Ok(Self::new(key, config.cookie_name.clone(), max_age, config.secure))
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn session_cookie(&self, payload: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), payload))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(self.max_age)
            .build()
    }
}

impl std::fmt::Debug for CookieSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSessionStore")
            .field("cookie_name", &self.cookie_name)
            .field("max_age", &self.max_age)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl SessionStore for CookieSessionStore {
    fn load(&self, headers: &HeaderMap) -> Session {
        let jar: PrivateCookieJar = PrivateCookieJar::from_headers(headers, self.key.clone());
        let Some(cookie) = jar.get(&self.cookie_name) else {
            return Session::default();
        };

        match serde_json::from_str::<SessionRecord>(cookie.value()) {
            Ok(record) => record.into(),
            Err(e) => {
                tracing::debug!(error = %e, "Discarding malformed session payload");
                Session::default()
            }
        }
    }

    fn save(&self, session: &Session) -> Result<HeaderValue, SessionError> {
        let payload = serde_json::to_string(&SessionRecord::from(session))?;
        let jar: PrivateCookieJar = PrivateCookieJar::new(self.key.clone());
        let response = jar.add(self.session_cookie(payload)).into_response();

        let value = response
            .headers()
            .get(SET_COOKIE)
            .cloned()
            .ok_or(SessionError::MissingCookie)?;
        if value.len() > MAX_COOKIE_BYTES {
            return Err(SessionError::TooLarge(value.len()));
        }
        Ok(value)
    }

    fn expire(&self) -> Result<HeaderValue, SessionError> {
        let cookie = Cookie::build((self.cookie_name.clone(), ""))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build();
        Ok(HeaderValue::from_str(&cookie.to_string())?)
    }
}

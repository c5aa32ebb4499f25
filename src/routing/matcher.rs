//! Request path matching.
//!
//! # Responsibilities
//! - Match exact paths (exempt endpoints)
//! - Match file-extension suffixes (static assets)
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching
//! - Matchers inspect request heads only, never bodies

use axum::http::request::Parts;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Parts) -> bool;
}

/// Matches one of a fixed set of paths exactly.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    paths: Vec<String>,
}

impl ExactPathMatcher {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl Matcher for ExactPathMatcher {
    fn matches(&self, req: &Parts) -> bool {
        let path = req.uri.path();
        self.paths.iter().any(|p| p == path)
    }
}

/// Matches paths ending in `.<ext>` for any of the configured extensions.
#[derive(Debug, Clone)]
pub struct ExtensionMatcher {
    suffixes: Vec<String>,
}

impl ExtensionMatcher {
    /// Create a matcher from bare extensions (without the leading dot).
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            suffixes: extensions
                .into_iter()
                .map(|ext| format!(".{}", ext.as_ref()))
                .collect(),
        }
    }
}

impl Matcher for ExtensionMatcher {
    fn matches(&self, req: &Parts) -> bool {
        let path = req.uri.path();
        self.suffixes.iter().any(|s| path.ends_with(s.as_str()))
    }
}

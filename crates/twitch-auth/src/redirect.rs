//! Access-token capture from browser navigations.
//!
//! With the implicit grant, Twitch sends the browser to the registered
//! redirect URI with the token in the fragment:
//!
//! ```text
//! https://localhost/#access_token=abc123&scope=user_read&token_type=bearer
//! ```
//!
//! Nothing listens on that address. The browser surface reports every URI it
//! navigates to, and [`RedirectInterceptor`] picks the token out of the first
//! one that matches.

use crate::error::{Result, TwitchAuthError};

/// Redirect URI registered for the application by default.
pub const DEFAULT_REDIRECT_URI: &str = "https://localhost";

/// Key that precedes the token value in the redirect fragment.
pub const ACCESS_TOKEN_KEY: &str = "access_token=";

/// Build the prefix a navigation must start with to carry a token.
///
/// `https://localhost` and `https://localhost/` both give
/// `https://localhost/#access_token`.
pub fn redirect_marker(redirect_uri: &str) -> String {
    format!("{}/#access_token", redirect_uri.trim_end_matches('/'))
}

/// Pull the access token out of a navigated-to URI.
///
/// Returns `Ok(None)` if `uri` does not start with `marker` (exact,
/// case-sensitive). The token runs from just after [`ACCESS_TOKEN_KEY`] to
/// the next `&` or the end of the string and is returned as-is, without
/// percent-decoding.
///
/// # Errors
///
/// Returns [`TwitchAuthError::MalformedRedirect`] if the URI matches the
/// marker but has no `access_token=` key or an empty value.
pub fn extract_access_token(uri: &str, marker: &str) -> Result<Option<String>> {
    if !uri.starts_with(marker) {
        return Ok(None);
    }

    let malformed = || TwitchAuthError::MalformedRedirect {
        uri: uri.to_string(),
    };

    let start = uri.find(ACCESS_TOKEN_KEY).ok_or_else(malformed)? + ACCESS_TOKEN_KEY.len();
    let rest = &uri[start..];
    let token = rest.split_once('&').map_or(rest, |(token, _)| token);

    if token.is_empty() {
        return Err(malformed());
    }

    Ok(Some(token.to_string()))
}

// ---------------------------------------------------------------------------
// Interceptor
// ---------------------------------------------------------------------------

/// What the interceptor made of one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Not the redirect; keep watching.
    Ignored,
    /// The redirect arrived without a usable token; keep watching.
    Malformed,
    /// The token was captured by this navigation.
    Acquired(String),
    /// A token was already captured; this navigation changed nothing.
    AlreadyAcquired,
}

/// Watches a stream of navigations for the OAuth redirect.
///
/// One interceptor serves one sign-in attempt: the first token it captures
/// is kept, and every later navigation reports [`Observation::AlreadyAcquired`].
#[derive(Debug, Clone)]
pub struct RedirectInterceptor {
    marker: String,
    token: Option<String>,
}

impl RedirectInterceptor {
    /// Create an interceptor for the given registered redirect URI.
    pub fn new(redirect_uri: &str) -> Self {
        Self {
            marker: redirect_marker(redirect_uri),
            token: None,
        }
    }

    /// Inspect one navigated-to URI.
    pub fn observe(&mut self, uri: &str) -> Observation {
        if self.token.is_some() {
            return Observation::AlreadyAcquired;
        }

        match extract_access_token(uri, &self.marker) {
            Ok(None) => Observation::Ignored,
            Ok(Some(token)) => {
                tracing::debug!("access token captured from redirect");
                self.token = Some(token.clone());
                Observation::Acquired(token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "redirect did not carry an access token");
                Observation::Malformed
            }
        }
    }

    /// The captured token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Whether a token has been captured.
    pub fn is_acquired(&self) -> bool {
        self.token.is_some()
    }

    /// The prefix this interceptor matches against.
    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Default for RedirectInterceptor {
    fn default() -> Self {
        Self::new(DEFAULT_REDIRECT_URI)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

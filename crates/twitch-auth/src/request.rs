//! Construction of authenticated Kraken API requests.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TwitchAuthError};

/// Media type selecting version 5 of the Kraken API.
pub const KRAKEN_V5_ACCEPT: &str = "application/vnd.twitchtv.v5+json";

// ---------------------------------------------------------------------------
// Verbs and endpoints
// ---------------------------------------------------------------------------

/// HTTP verbs the API client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    /// The method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kraken endpoints a request can target.
///
/// Only [`Endpoint::User`] has a response handler; the others can be built
/// and sent but their responses are reported as unhandled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    None,
    User,
    Channels,
    Subscriptions,
}

impl Endpoint {
    /// Path appended to the API base URL, or `None` for [`Endpoint::None`].
    pub fn path(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::User => Some("/user"),
            Self::Channels => Some("/channel"),
            Self::Subscriptions => Some("/channel/subscriptions"),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::User => write!(f, "user"),
            Self::Channels => write!(f, "channels"),
            Self::Subscriptions => write!(f, "subscriptions"),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Correlates a completed response with the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh, time-ordered id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A fully built API request, ready to hand to an [`crate::HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub id: RequestId,
    pub endpoint: Endpoint,
    pub verb: HttpVerb,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Builds requests against one API root for one client ID.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    client_id: String,
}

impl RequestBuilder {
    /// Create a builder. A trailing `/` on `base_url` is ignored.
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.into(),
        }
    }

    /// Build a request for `endpoint`.
    ///
    /// The `Authorization: OAuth <token>` header is only attached when
    /// `token` is present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`TwitchAuthError::InvalidRequest`] for [`Endpoint::None`].
    pub fn build(
        &self,
        endpoint: Endpoint,
        verb: HttpVerb,
        token: Option<&str>,
    ) -> Result<ApiRequest> {
        let path = endpoint.path().ok_or_else(|| TwitchAuthError::InvalidRequest {
            reason: format!("endpoint `{endpoint}` has no path"),
        })?;

        let mut headers = vec![
            ("Accept".to_string(), KRAKEN_V5_ACCEPT.to_string()),
            ("Client-ID".to_string(), self.client_id.clone()),
        ];
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            headers.push(("Authorization".to_string(), format!("OAuth {token}")));
        }

        let request = ApiRequest {
            id: RequestId::new(),
            endpoint,
            verb,
            url: format!("{}{path}", self.base_url),
            headers,
        };

        tracing::debug!(
            request_id = %request.id,
            endpoint = %endpoint,
            verb = %verb,
            url = %request.url,
            "built API request"
        );

        Ok(request)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! The HTTP client seam and its reqwest implementation.
//!
//! An [`HttpClient`] executes one [`ApiRequest`] and reports what happened
//! as an [`HttpCompletion`]: whether the transport succeeded and the
//! response, if any. Judging the outcome is left to the dispatcher.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::request::{ApiRequest, HttpVerb};

/// Status and body of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// The outcome of executing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCompletion {
    /// The response, if one was received.
    pub response: Option<HttpResponse>,
    /// Whether the request went fully through the transport.
    pub succeeded: bool,
}

impl HttpCompletion {
    /// A completion carrying a fully received response.
    pub fn ok(status: u16, body: impl Into<String>) -> Self {
        Self {
            response: Some(HttpResponse::new(status, body)),
            succeeded: true,
        }
    }

    /// A completion for a request that never produced a response.
    pub fn failed() -> Self {
        Self {
            response: None,
            succeeded: false,
        }
    }
}

/// Executes API requests.
///
/// Implementations never fail outright; every outcome, including network
/// errors, is described by the returned [`HttpCompletion`].
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute `request` and report the outcome.
    async fn execute(&self, request: &ApiRequest) -> HttpCompletion;
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

/// [`HttpClient`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a client that gives up on a request after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TwitchAuthError::Network`] if the TLS backend cannot
    /// be initialised.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn method(verb: HttpVerb) -> reqwest::Method {
        match verb {
            HttpVerb::Get => reqwest::Method::GET,
            HttpVerb::Post => reqwest::Method::POST,
            HttpVerb::Put => reqwest::Method::PUT,
            HttpVerb::Patch => reqwest::Method::PATCH,
            HttpVerb::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: &ApiRequest) -> HttpCompletion {
        let mut builder = self
            .client
            .request(Self::method(request.verb), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let start = std::time::Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(request_id = %request.id, error = %e, "request failed");
                return HttpCompletion::failed();
            }
        };

        let status = response.status().as_u16();
        let completion = match response.text().await {
            Ok(body) => HttpCompletion::ok(status, body),
            Err(e) => {
                tracing::warn!(
                    request_id = %request.id,
                    status,
                    error = %e,
                    "failed to read response body"
                );
                HttpCompletion {
                    response: Some(HttpResponse::new(status, String::new())),
                    succeeded: false,
                }
            }
        };

        tracing::debug!(
            request_id = %request.id,
            status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "request completed"
        );

        completion
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Error types for the Twitch sign-in crate.
//!
//! Every fallible step of the sign-in flow surfaces its failure through
//! [`TwitchAuthError`]. The orchestrator never propagates these to the
//! caller of [`crate::TwitchAuth::start_user_sign_in`] once the flow is
//! running; they are logged, published as [`crate::SignInEvent::Failed`],
//! and returned from [`crate::SignInTask::wait`].

/// Unified error type for the Twitch sign-in flow.
#[derive(Debug, thiserror::Error)]
pub enum TwitchAuthError {
    /// The HTTP client reported a network-level failure, or completed
    /// without producing a response.
    #[error("transport failure: {reason}")]
    TransportFailure {
        /// What the transport reported.
        reason: String,
    },

    /// The API answered with a status outside 200..=299.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The response status code.
        status: u16,
        /// The response body, verbatim.
        body: String,
    },

    /// A response body could not be decoded into the expected record.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A navigation matched the redirect marker but carried no usable token.
    #[error("malformed redirect: {uri}")]
    MalformedRedirect {
        /// The offending URI.
        uri: String,
    },

    /// A completion arrived for a request that was never tracked, or was
    /// already dispatched.
    #[error("no in-flight request with id {request_id}")]
    UnknownRequest {
        /// The correlation id carried by the completion.
        request_id: String,
    },

    /// The request could not be built.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected.
        reason: String,
    },

    /// `start_user_sign_in` was called while another attempt is running.
    #[error("a sign-in is already in progress")]
    SignInInProgress,

    /// `start_user_sign_in` was called outside a tokio runtime.
    #[error("no tokio runtime available to drive the sign-in")]
    NoRuntime,

    /// The sign-in was cancelled, or its owner dropped, before it finished.
    #[error("sign-in cancelled")]
    Cancelled,

    /// The browser surface stopped emitting navigations before a token
    /// was captured.
    #[error("browser surface closed before an access token was received")]
    SurfaceClosed,

    /// The host could not provide or drive a browser surface.
    #[error("browser surface error: {reason}")]
    Surface {
        /// Details from the host.
        reason: String,
    },

    /// Configuration is missing or malformed.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// URL parsing error.
    #[error("url parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The reqwest client could not be constructed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, TwitchAuthError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Sign-in configuration.
//!
//! Every field except `client_id` has a working default, so a config file
//! only needs to name the registered application.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TwitchAuthError};

/// Kraken implicit-grant authorization endpoint.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://api.twitch.tv/kraken/oauth2/authorize";

/// Kraken REST API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.twitch.tv/kraken";

/// Scope needed to read the signed-in user's profile and email.
pub const DEFAULT_SCOPE: &str = "user_read";

/// Default per-request timeout for the reqwest client, in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a Twitch implicit-grant sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitchAuthConfig {
    /// The application's client ID from the Twitch developer console.
    pub client_id: String,

    /// Ask Twitch to show the consent page even if the user already
    /// authorized this application.
    pub force_verify: bool,

    /// The authorization endpoint URL.
    pub authorize_url: String,

    /// Base URL that endpoint paths are appended to.
    pub api_base_url: String,

    /// Redirect URI registered for the application.
    pub redirect_uri: String,

    /// Scopes to request.
    pub scopes: Vec<String>,

    /// Timeout applied to each API request.
    pub request_timeout_secs: u64,
}

impl Default for TwitchAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            force_verify: true,
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            redirect_uri: crate::redirect::DEFAULT_REDIRECT_URI.to_string(),
            scopes: vec![DEFAULT_SCOPE.to_string()],
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl TwitchAuthConfig {
    /// Create a default configuration for the given client ID.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    /// Check that the configuration can drive a sign-in.
    ///
    /// # Errors
    ///
    /// Returns [`TwitchAuthError::InvalidConfig`] if the client ID is blank,
    /// any URL does not parse, or the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(TwitchAuthError::InvalidConfig {
                reason: "client_id is empty".to_string(),
            });
        }

        for (field, value) in [
            ("authorize_url", &self.authorize_url),
            ("api_base_url", &self.api_base_url),
            ("redirect_uri", &self.redirect_uri),
        ] {
            Url::parse(value).map_err(|e| TwitchAuthError::InvalidConfig {
                reason: format!("{field} `{value}` is not a valid URL: {e}"),
            })?;
        }

        if self.request_timeout_secs == 0 {
            return Err(TwitchAuthError::InvalidConfig {
                reason: "request_timeout_secs must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Build the authorization URL the browser surface should open.
    ///
    /// Any query parameters already present on `authorize_url` are kept.
    ///
    /// # Errors
    ///
    /// Returns [`TwitchAuthError::UrlParse`] if `authorize_url` is not a
    /// valid URL.
    pub fn authorization_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.authorize_url)?;

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "token");
            params.append_pair("client_id", &self.client_id);
            params.append_pair("redirect_uri", &self.redirect_uri);
            if !self.scopes.is_empty() {
                params.append_pair("scope", &self.scopes.join(" "));
            }
            params.append_pair("force_verify", if self.force_verify { "true" } else { "false" });
        }

        Ok(url.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn params(url: &str) -> HashMap<String, String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn defaults() {
        let config = TwitchAuthConfig::default();
        assert!(config.client_id.is_empty());
        assert!(config.force_verify);
        assert_eq!(config.api_base_url, "https://api.twitch.tv/kraken");
        assert_eq!(config.redirect_uri, "https://localhost");
        assert_eq!(config.scopes, vec!["user_read"]);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn authorization_url_includes_all_params() {
        let config = TwitchAuthConfig::new("abc123");
        let url = config.authorization_url().unwrap();

        assert!(url.starts_with("https://api.twitch.tv/kraken/oauth2/authorize?"));
        let params = params(&url);
        assert_eq!(params["response_type"], "token");
        assert_eq!(params["client_id"], "abc123");
        assert_eq!(params["redirect_uri"], "https://localhost");
        assert_eq!(params["scope"], "user_read");
        assert_eq!(params["force_verify"], "true");
    }

    #[test]
    fn authorization_url_force_verify_false() {
        let mut config = TwitchAuthConfig::new("abc123");
        config.force_verify = false;
        let params = params(&config.authorization_url().unwrap());
        assert_eq!(params["force_verify"], "false");
    }

    #[test]
    fn authorization_url_joins_scopes() {
        let mut config = TwitchAuthConfig::new("abc123");
        config.scopes = vec!["user_read".to_string(), "channel_read".to_string()];
        let params = params(&config.authorization_url().unwrap());
        assert_eq!(params["scope"], "user_read channel_read");
    }

    #[test]
    fn authorization_url_without_scopes() {
        let mut config = TwitchAuthConfig::new("abc123");
        config.scopes.clear();
        let params = params(&config.authorization_url().unwrap());
        assert!(!params.contains_key("scope"));
    }

    #[test]
    fn validate_rejects_blank_client_id() {
        let config = TwitchAuthConfig::new("   ");
        assert!(matches!(
            config.validate(),
            Err(TwitchAuthError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_url() {
        let mut config = TwitchAuthConfig::new("abc123");
        config.api_base_url = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api_base_url"));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = TwitchAuthConfig::new("abc123");
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_partial_config() {
        let config: TwitchAuthConfig =
            serde_json::from_str(r#"{"client_id":"abc","force_verify":false}"#).unwrap();
        assert_eq!(config.client_id, "abc");
        assert!(!config.force_verify);
        assert_eq!(config.authorize_url, DEFAULT_AUTHORIZE_URL);
        assert!(config.validate().is_ok());
    }
}

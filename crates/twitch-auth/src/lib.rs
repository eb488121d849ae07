//! Twitch user sign-in through an embedded browser surface.
//!
//! This crate implements the OAuth 2.0 implicit grant against Twitch's
//! Kraken API for hosts that can show a browser view, such as a game
//! engine viewport:
//!
//! - **Redirect interception**: watch the surface's navigations and capture
//!   the access token from the `https://localhost/#access_token=...` redirect
//! - **Authenticated requests**: build Kraken v5 requests with the
//!   `Authorization: OAuth <token>` and `Client-ID` headers
//! - **Response dispatch**: validate completions and route them by request
//!   id to the matching handler
//! - **Orchestration**: open the surface, tear it down once the token
//!   arrives, fetch `/user`, store the profile, and notify subscribers
//!
//! The host plugs in through [`SurfaceHost`] / [`NavigableSurface`] for the
//! browser view and, optionally, [`HttpClient`] for the network (a reqwest
//! implementation is included).
//!
//! # Architecture
//!
//! ```text
//! TwitchAuth
//! ├── RedirectInterceptor  (token capture from navigations)
//! ├── RequestBuilder       (URL + headers per endpoint)
//! ├── HttpClient           (reqwest, or host-provided)
//! ├── ResponseDispatcher   (validation + per-request routing)
//! └── MountedSurface       (browser surface ownership)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use twitch_auth::{SurfaceHost, TwitchAuth, TwitchAuthConfig};
//!
//! # async fn example(host: Arc<dyn SurfaceHost>) -> twitch_auth::error::Result<()> {
//! let auth = TwitchAuth::with_reqwest(TwitchAuthConfig::new("my-client-id"), host)?;
//!
//! let task = auth.start_user_sign_in()?;
//! let user = task.wait().await?;
//! println!("signed in as {}", user.display_name);
//!
//! assert_eq!(auth.signed_in_user(), user);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod profile;
pub mod redirect;
pub mod request;
pub mod session;
pub mod surface;

// Re-export key types at the crate root for convenience.
pub use config::TwitchAuthConfig;
pub use dispatch::{Dispatched, ResponseDispatcher, is_response_valid};
pub use error::{Result, TwitchAuthError};
pub use http::{HttpClient, HttpCompletion, HttpResponse, ReqwestHttpClient};
pub use profile::{UserProfile, decode_user_profile};
pub use redirect::{Observation, RedirectInterceptor, extract_access_token};
pub use request::{ApiRequest, Endpoint, HttpVerb, RequestBuilder, RequestId};
pub use session::{SignInEvent, SignInState, SignInTask, TwitchAuth};
pub use surface::{MountedSurface, NavigableSurface, SurfaceHost, SurfaceId};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

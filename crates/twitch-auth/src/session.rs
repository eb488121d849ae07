//! The sign-in orchestrator.
//!
//! [`TwitchAuth`] runs one sign-in at a time through these states:
//!
//! ```text
//! Idle ──start──▶ BrowserOpen ──token──▶ RequestingProfile ──profile──▶ SignedIn
//!   ▲                  │                         │                         │
//!   └──── surface closed / cancelled / failed ◀──┘                         │
//!   ▲                                                                      │
//!   └──────────────────────────── start again ◀────────────────────────────┘
//! ```
//!
//! The browser surface is driven by a background task on the tokio runtime.
//! Callers either await the [`SignInTask`] returned by
//! [`TwitchAuth::start_user_sign_in`], or subscribe to [`SignInEvent`]s and
//! read [`TwitchAuth::signed_in_user`] when `UserSignedIn` arrives.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinHandle};

use crate::config::TwitchAuthConfig;
use crate::dispatch::{Dispatched, ResponseDispatcher};
use crate::error::{Result, TwitchAuthError};
use crate::http::{HttpClient, HttpCompletion, ReqwestHttpClient};
use crate::profile::UserProfile;
use crate::redirect::{Observation, RedirectInterceptor};
use crate::request::{ApiRequest, Endpoint, HttpVerb, RequestBuilder, RequestId};
use crate::surface::{MountedSurface, SurfaceHost};

/// Capacity of the event channel; slow subscribers lag beyond this.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// State and events
// ---------------------------------------------------------------------------

/// Where the sign-in flow currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInState {
    /// No sign-in running, or the last one ended without a profile.
    #[default]
    Idle,
    /// The authorization page is displayed; waiting for the redirect.
    BrowserOpen,
    /// Token captured; the profile request is in flight.
    RequestingProfile,
    /// The profile has been fetched and stored.
    SignedIn,
}

impl SignInState {
    /// Whether a sign-in attempt is currently running.
    pub fn is_in_progress(self) -> bool {
        matches!(self, Self::BrowserOpen | Self::RequestingProfile)
    }
}

impl fmt::Display for SignInState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::BrowserOpen => write!(f, "browser_open"),
            Self::RequestingProfile => write!(f, "requesting_profile"),
            Self::SignedIn => write!(f, "signed_in"),
        }
    }
}

/// Notifications published while a sign-in runs.
#[derive(Debug, Clone)]
pub enum SignInEvent {
    /// The flow moved to a new state.
    StateChanged { state: SignInState },
    /// The profile was fetched; published once per completed sign-in.
    UserSignedIn {
        profile: UserProfile,
        at: DateTime<Utc>,
    },
    /// A step failed. The attempt may keep running (a malformed redirect)
    /// or may have ended (every other error).
    Failed { error: String },
}

// ---------------------------------------------------------------------------
// Task handle
// ---------------------------------------------------------------------------

/// Handle to a running sign-in.
#[derive(Debug)]
pub struct SignInTask {
    handle: JoinHandle<Result<UserProfile>>,
}

impl SignInTask {
    /// Wait for the sign-in to finish.
    ///
    /// # Errors
    ///
    /// Returns whatever ended the attempt, or [`TwitchAuthError::Cancelled`]
    /// if it was cancelled or its [`TwitchAuth`] was dropped.
    pub async fn wait(self) -> Result<UserProfile> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(TwitchAuthError::Cancelled),
            Err(e) => Err(TwitchAuthError::Surface {
                reason: format!("sign-in task panicked: {e}"),
            }),
        }
    }

    /// Whether the sign-in has finished, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Session {
    state: SignInState,
    access_token: Option<String>,
    profile: UserProfile,
    /// Bumped by every start and cancel; a driver only writes while its
    /// attempt is current.
    attempt: u64,
}

struct Inner<C> {
    config: TwitchAuthConfig,
    builder: RequestBuilder,
    client: C,
    host: Arc<dyn SurfaceHost>,
    session: Mutex<Session>,
    dispatcher: Mutex<ResponseDispatcher>,
    events: broadcast::Sender<SignInEvent>,
}

/// Drives Twitch sign-in through a host-provided browser surface.
///
/// Dropping the orchestrator abandons any running sign-in and tears its
/// browser surface down.
pub struct TwitchAuth<C: HttpClient + 'static = ReqwestHttpClient> {
    inner: Arc<Inner<C>>,
    driver: Mutex<Option<AbortHandle>>,
}

impl TwitchAuth<ReqwestHttpClient> {
    /// Create an orchestrator that talks to the API through reqwest.
    ///
    /// # Errors
    ///
    /// Returns [`TwitchAuthError::InvalidConfig`] for an unusable config, or
    /// [`TwitchAuthError::Network`] if the HTTP client cannot be built.
    pub fn with_reqwest(config: TwitchAuthConfig, host: Arc<dyn SurfaceHost>) -> Result<Self> {
        let client = ReqwestHttpClient::new(std::time::Duration::from_secs(
            config.request_timeout_secs,
        ))?;
        Self::new(config, client, host)
    }
}

impl<C: HttpClient + 'static> TwitchAuth<C> {
    /// Create an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`TwitchAuthError::InvalidConfig`] if `config` fails
    /// validation.
    pub fn new(config: TwitchAuthConfig, client: C, host: Arc<dyn SurfaceHost>) -> Result<Self> {
        config.validate()?;
        let builder = RequestBuilder::new(&config.api_base_url, &config.client_id);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                builder,
                client,
                host,
                session: Mutex::new(Session::default()),
                dispatcher: Mutex::new(ResponseDispatcher::new()),
                events,
            }),
            driver: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &TwitchAuthConfig {
        &self.inner.config
    }

    /// The URL the browser surface is sent to.
    pub fn authorization_url(&self) -> Result<String> {
        self.inner.config.authorization_url()
    }

    /// Begin a sign-in.
    ///
    /// Opens a browser surface on the authorization page and returns as soon
    /// as it is displayed; the rest of the flow runs in the background. Must
    /// be called from within a tokio runtime. A previous token is discarded;
    /// the stored profile is kept until the new one arrives.
    ///
    /// # Errors
    ///
    /// - [`TwitchAuthError::NoRuntime`] if called outside a tokio runtime;
    ///   nothing is changed in that case.
    /// - [`TwitchAuthError::SignInInProgress`] if an attempt is running.
    /// - Surface or URL errors if the browser surface cannot be opened; the
    ///   state is left unchanged in that case.
    pub fn start_user_sign_in(&self) -> Result<SignInTask> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            tracing::warn!(error = %e, "sign-in started outside a tokio runtime");
            TwitchAuthError::NoRuntime
        })?;

        let (previous, attempt) = {
            let mut session = lock(&self.inner.session);
            if session.state.is_in_progress() {
                tracing::warn!(state = %session.state, "sign-in already in progress");
                return Err(TwitchAuthError::SignInInProgress);
            }
            let previous = session.state;
            session.state = SignInState::BrowserOpen;
            session.access_token = None;
            session.attempt += 1;
            (previous, session.attempt)
        };

        let surface = match self.open_surface() {
            Ok(surface) => surface,
            Err(e) => {
                let mut session = lock(&self.inner.session);
                if session.attempt == attempt {
                    session.state = previous;
                }
                tracing::warn!(error = %e, "failed to open browser surface");
                return Err(e);
            }
        };

        tracing::info!(
            surface = %surface.id(),
            force_verify = self.inner.config.force_verify,
            "sign-in started, waiting for redirect"
        );
        self.inner.publish(SignInEvent::StateChanged {
            state: SignInState::BrowserOpen,
        });

        let inner = Arc::clone(&self.inner);
        let handle = runtime.spawn(async move { inner.drive(attempt, surface).await });
        *lock(&self.driver) = Some(handle.abort_handle());

        Ok(SignInTask { handle })
    }

    /// Run a complete sign-in and wait for the profile.
    pub async fn sign_in(&self) -> Result<UserProfile> {
        self.start_user_sign_in()?.wait().await
    }

    /// Abandon the running sign-in, if any.
    ///
    /// Its browser surface is torn down and the state returns to `Idle`.
    pub fn cancel_sign_in(&self) {
        if let Some(driver) = lock(&self.driver).take() {
            driver.abort();
        }

        let cancelled = {
            let mut session = lock(&self.inner.session);
            session.attempt += 1;
            let running = session.state.is_in_progress();
            if running {
                session.state = SignInState::Idle;
            }
            running
        };

        if cancelled {
            tracing::info!("sign-in cancelled");
            self.inner.publish(SignInEvent::StateChanged {
                state: SignInState::Idle,
            });
        }
    }

    /// Snapshot of the stored profile; empty until a sign-in completes.
    pub fn signed_in_user(&self) -> UserProfile {
        lock(&self.inner.session).profile.clone()
    }

    pub fn state(&self) -> SignInState {
        lock(&self.inner.session).state
    }

    /// The token captured by the latest sign-in, if any.
    pub fn access_token(&self) -> Option<String> {
        lock(&self.inner.session).access_token.clone()
    }

    /// Subscribe to sign-in notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SignInEvent> {
        self.inner.events.subscribe()
    }

    /// Issue an API request authenticated with the current token.
    ///
    /// # Errors
    ///
    /// Any request, transport, status, or decode error from
    /// [`ResponseDispatcher::dispatch`].
    pub async fn request(&self, endpoint: Endpoint, verb: HttpVerb) -> Result<Dispatched> {
        self.inner.request(endpoint, verb).await
    }

    /// Number of API requests awaiting a response.
    pub fn pending_requests(&self) -> usize {
        lock(&self.inner.dispatcher).pending()
    }

    fn open_surface(&self) -> Result<MountedSurface> {
        let url = self.inner.config.authorization_url()?;
        let surface = self.inner.host.create_surface()?;
        MountedSurface::mount(surface, Arc::clone(&self.inner.host), &url)
    }
}

impl<C: HttpClient + 'static> Drop for TwitchAuth<C> {
    fn drop(&mut self) {
        if let Some(driver) = lock(&self.driver).take() {
            driver.abort();
        }
    }
}

impl<C: HttpClient + 'static> Inner<C> {
    async fn drive(self: Arc<Self>, attempt: u64, mut surface: MountedSurface) -> Result<UserProfile> {
        let result = self.run(attempt, &mut surface).await;

        if let Err(ref e) = result {
            tracing::warn!(error = %e, "sign-in did not complete");
            let current = self.update(attempt, |session| {
                if session.state.is_in_progress() {
                    session.state = SignInState::Idle;
                }
            });
            // Abandoned attempts stay quiet.
            if current {
                self.publish(SignInEvent::Failed {
                    error: e.to_string(),
                });
                self.publish(SignInEvent::StateChanged {
                    state: SignInState::Idle,
                });
            }
        }

        result
    }

    async fn run(&self, attempt: u64, surface: &mut MountedSurface) -> Result<UserProfile> {
        let mut interceptor = RedirectInterceptor::new(&self.config.redirect_uri);

        let token = loop {
            let Some(uri) = surface.next_url().await else {
                surface.unmount();
                return Err(TwitchAuthError::SurfaceClosed);
            };

            match interceptor.observe(&uri) {
                Observation::Acquired(token) => break token,
                Observation::Malformed => self.publish(SignInEvent::Failed {
                    error: TwitchAuthError::MalformedRedirect { uri }.to_string(),
                }),
                Observation::Ignored | Observation::AlreadyAcquired => {}
            }
        };

        surface.unmount();
        let current = self.update(attempt, |session| {
            session.access_token = Some(token);
            session.state = SignInState::RequestingProfile;
        });
        if !current {
            return Err(TwitchAuthError::Cancelled);
        }
        tracing::info!("access token received, fetching user profile");
        self.publish(SignInEvent::StateChanged {
            state: SignInState::RequestingProfile,
        });

        let profile = match self.request(Endpoint::User, HttpVerb::Get).await? {
            Dispatched::UserProfile(profile) => profile,
            Dispatched::Unhandled(endpoint) => {
                return Err(TwitchAuthError::InvalidRequest {
                    reason: format!("no profile handler for endpoint `{endpoint}`"),
                });
            }
        };

        let current = self.update(attempt, |session| {
            session.profile = profile.clone();
            session.state = SignInState::SignedIn;
        });
        if !current {
            return Err(TwitchAuthError::Cancelled);
        }
        tracing::info!(
            user = %profile.name,
            display_name = %profile.display_name,
            "user signed in"
        );
        self.publish(SignInEvent::StateChanged {
            state: SignInState::SignedIn,
        });
        self.publish(SignInEvent::UserSignedIn {
            profile: profile.clone(),
            at: Utc::now(),
        });

        Ok(profile)
    }

    async fn request(&self, endpoint: Endpoint, verb: HttpVerb) -> Result<Dispatched> {
        let token = lock(&self.session).access_token.clone();
        let request = self.builder.build(endpoint, verb, token.as_deref())?;

        let in_flight = InFlight::track(&self.dispatcher, &request);
        let completion = self.client.execute(&request).await;
        in_flight.complete(completion)
    }

    /// Apply `f` if `attempt` is still the current one. Returns whether it was.
    fn update(&self, attempt: u64, f: impl FnOnce(&mut Session)) -> bool {
        let mut session = lock(&self.session);
        if session.attempt != attempt {
            return false;
        }
        f(&mut session);
        true
    }

    fn publish(&self, event: SignInEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// A tracked request; untracked again if dropped before its completion is
/// dispatched (the driver was aborted mid-request).
struct InFlight<'a> {
    dispatcher: &'a Mutex<ResponseDispatcher>,
    id: RequestId,
    dispatched: bool,
}

impl<'a> InFlight<'a> {
    fn track(dispatcher: &'a Mutex<ResponseDispatcher>, request: &ApiRequest) -> Self {
        lock(dispatcher).track(request);
        Self {
            dispatcher,
            id: request.id,
            dispatched: false,
        }
    }

    fn complete(mut self, completion: HttpCompletion) -> Result<Dispatched> {
        self.dispatched = true;
        lock(self.dispatcher).dispatch(self.id, completion)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.dispatched && lock(self.dispatcher).untrack(self.id) {
            tracing::debug!(request_id = %self.id, "request abandoned before completion");
        }
    }
}

/// Lock a mutex, recovering the data if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Validation and routing of completed API requests.
//!
//! Every request is tracked under its [`RequestId`] before it is executed,
//! and its completion is routed by that id. Overlapping requests to
//! different endpoints therefore never pick up each other's handler.

use std::collections::HashMap;

use crate::error::{Result, TwitchAuthError};
use crate::http::{HttpCompletion, HttpResponse};
use crate::profile::{UserProfile, decode_user_profile};
use crate::request::{ApiRequest, Endpoint, RequestId};

/// Whether a completion carries a usable response.
///
/// True only if the transport succeeded, a response is present, and its
/// status is in `200..=299`.
pub fn is_response_valid(response: Option<&HttpResponse>, succeeded: bool) -> bool {
    succeeded && response.is_some_and(|r| (200..=299).contains(&r.status))
}

/// The result of routing a valid response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// A `/user` response, decoded.
    UserProfile(UserProfile),
    /// A valid response for an endpoint with no handler.
    Unhandled(Endpoint),
}

/// Routes completions to the handler for the endpoint they were issued for.
#[derive(Debug, Default)]
pub struct ResponseDispatcher {
    in_flight: HashMap<RequestId, Endpoint>,
}

impl ResponseDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `request` as in flight. Call before executing it.
    pub fn track(&mut self, request: &ApiRequest) {
        self.in_flight.insert(request.id, request.endpoint);
    }

    /// Stop tracking a request whose completion will never arrive.
    pub fn untrack(&mut self, id: RequestId) -> bool {
        self.in_flight.remove(&id).is_some()
    }

    /// Number of tracked requests still awaiting a completion.
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Validate and route one completion.
    ///
    /// The request stops being tracked whatever the outcome.
    ///
    /// # Errors
    ///
    /// - [`TwitchAuthError::UnknownRequest`] if `id` is not in flight.
    /// - [`TwitchAuthError::TransportFailure`] if the transport failed or
    ///   produced no response.
    /// - [`TwitchAuthError::HttpStatus`] for a non-2xx status.
    /// - [`TwitchAuthError::Decode`] if a `/user` body is not a JSON object.
    pub fn dispatch(&mut self, id: RequestId, completion: HttpCompletion) -> Result<Dispatched> {
        let endpoint = self
            .in_flight
            .remove(&id)
            .ok_or_else(|| TwitchAuthError::UnknownRequest {
                request_id: id.to_string(),
            })
            .inspect_err(|e| tracing::warn!(error = %e, "dropping untracked completion"))?;

        let response = Self::validate(id, endpoint, completion)?;

        match endpoint {
            Endpoint::User => {
                let profile = decode_user_profile(&response.body).inspect_err(|e| {
                    tracing::warn!(
                        request_id = %id,
                        error = %e,
                        "failed to decode user profile"
                    )
                })?;
                tracing::debug!(request_id = %id, user = %profile.name, "user profile received");
                Ok(Dispatched::UserProfile(profile))
            }
            other => {
                tracing::debug!(request_id = %id, endpoint = %other, "no handler for endpoint");
                Ok(Dispatched::Unhandled(other))
            }
        }
    }

    fn validate(
        id: RequestId,
        endpoint: Endpoint,
        completion: HttpCompletion,
    ) -> Result<HttpResponse> {
        let valid = is_response_valid(completion.response.as_ref(), completion.succeeded);

        let err = match completion.response {
            Some(response) if valid => return Ok(response),
            Some(response) if completion.succeeded => TwitchAuthError::HttpStatus {
                status: response.status,
                body: response.body,
            },
            Some(response) => TwitchAuthError::TransportFailure {
                reason: format!("transport failed after HTTP {}", response.status),
            },
            None if completion.succeeded => TwitchAuthError::TransportFailure {
                reason: "request completed without a response".to_string(),
            },
            None => TwitchAuthError::TransportFailure {
                reason: "request did not complete".to_string(),
            },
        };

        tracing::warn!(
            request_id = %id,
            endpoint = %endpoint,
            error = %err,
            "rejecting response"
        );
        Err(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

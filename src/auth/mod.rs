//! Auth Controller: login, registration, profile fetch and logout.
//!
//! The only component that changes who the client is signed in as. The
//! current identity is published on a `watch` channel so hosts can recompute
//! capabilities whenever it changes.

pub mod identity;

pub use identity::{AuthSession, RegistrationProfile, UserIdentity};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::capability::{capabilities_for, CapabilitySet};
use crate::error::{extract_aggregate_message, extract_field_error, AuthError, ClientError, ClientResult, TransportError};
use crate::refresh::RefreshCoordinator;
use crate::resources::departments::Department;
use crate::session::claims::{fingerprint, inspect_access_token};
use crate::session::SessionGate;
use crate::transport::ApiRequest;
use crate::types::ResellerId;
use identity::{AuthPayload, LoginPayload, RegisterPayload};

pub const LOGIN_PATH: &str = "/users/auth/login/";
pub const REGISTER_PATH: &str = "/users/auth/register/";
pub const PROFILE_PATH: &str = "/users/profile/";

const LOGIN_FALLBACK: &str = "Login failed. Please check your credentials.";
const REGISTER_FALLBACK: &str = "Registration failed";

/// Snapshot of the session for status displays
#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub persistent: bool,
    pub identity: Option<UserIdentity>,
    pub access_token: Option<String>,
    pub access_expires_at: Option<DateTime<Utc>>,
    pub session_expires_at: Option<DateTime<Utc>>,
}

pub struct AuthController {
    coordinator: Arc<RefreshCoordinator>,
    gate: SessionGate,
    identity: watch::Sender<Option<UserIdentity>>,
}

impl AuthController {
    pub fn new(coordinator: Arc<RefreshCoordinator>, gate: SessionGate) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            coordinator,
            gate,
            identity,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.identity.subscribe()
    }

    pub fn identity(&self) -> Option<UserIdentity> {
        self.identity.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.gate.is_authenticated()
    }

    pub fn capabilities(&self) -> CapabilitySet {
        capabilities_for(self.identity.borrow().as_ref())
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthSession> {
        debug!("Login attempt for {}", email);
        let request = ApiRequest::post(LOGIN_PATH).with_json(&LoginPayload { email, password })?;

        let response = self
            .coordinator
            .execute_public(&request)
            .await
            .map_err(|err| map_auth_failure(err, LOGIN_FALLBACK))?;

        let session = self.complete_authentication(response.body)?;
        info!("Logged in as {}", session.identity.email);
        Ok(session)
    }

    /// Register a direct customer, or a reseller customer when `reseller_id` is given
    pub async fn register(&self, profile: &RegistrationProfile, reseller_id: Option<ResellerId>) -> ClientResult<AuthSession> {
        let reseller_id = reseller_id.filter(|id| id.0 > 0);
        let payload = RegisterPayload {
            full_name: &profile.full_name,
            email: &profile.email,
            password: &profile.password,
            reseller_id,
            department_name: profile.department_name.as_deref().filter(|name| !name.trim().is_empty()),
        };
        match reseller_id {
            Some(id) => debug!("Registering {} as customer of reseller {}", profile.email, id),
            None => debug!("Registering {} as direct customer", profile.email),
        }

        let request = ApiRequest::post(REGISTER_PATH).with_json(&payload)?;
        let response = self
            .coordinator
            .execute_public(&request)
            .await
            .map_err(|err| map_auth_failure(err, REGISTER_FALLBACK))?;

        let session = self.complete_authentication(response.body)?;
        info!("Registered {}", session.identity.email);
        Ok(session)
    }

    fn complete_authentication(&self, body: Value) -> ClientResult<AuthSession> {
        let payload: AuthPayload = serde_json::from_value(body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        let tokens = payload
            .tokens
            .ok_or_else(|| AuthError::MalformedResponse("response did not include tokens".to_string()))?;
        let identity = payload
            .user
            .ok_or_else(|| AuthError::MalformedResponse("response did not include a user".to_string()))?;

        self.coordinator.store().save(&tokens)?;
        self.identity.send_replace(Some(identity.clone()));

        Ok(AuthSession { identity, tokens })
    }

    /// Fetch the current identity; a dead session is torn down rather than retried
    pub async fn fetch_profile(&self) -> ClientResult<UserIdentity> {
        match self.coordinator.execute(&ApiRequest::get(PROFILE_PATH)).await {
            Ok(response) => {
                let mut identity: UserIdentity = response
                    .json()
                    .map_err(|e| AuthError::MalformedResponse(format!("profile: {}", e)))?;

                // Keep membership data gathered for the same user
                if let Some(previous) = self.identity.borrow().as_ref() {
                    if previous.identifier() == identity.identifier() && previous.email == identity.email {
                        identity.administered_departments = previous.administered_departments.clone();
                    }
                }

                self.identity.send_replace(Some(identity.clone()));
                Ok(identity)
            }
            Err(err) => {
                if err.is_session_lost() {
                    warn!("Profile fetch rejected, clearing session: {}", err);
                    if let Err(e) = self.coordinator.store().clear() {
                        warn!("Failed to clear session: {}", e);
                    }
                    self.identity.send_replace(None);
                }
                Err(err)
            }
        }
    }

    /// Startup hook: load the profile if a session is present
    pub async fn bootstrap(&self) -> ClientResult<Option<UserIdentity>> {
        if !self.gate.is_authenticated() {
            self.identity.send_replace(None);
            return Ok(None);
        }
        self.fetch_profile().await.map(Some)
    }

    /// Clear credentials immediately; in-flight responses are the caller's to ignore
    pub fn logout(&self, redirect: bool) -> ClientResult<()> {
        let cleared = self.coordinator.store().clear();
        self.identity.send_replace(None);
        if redirect {
            self.coordinator.redirects().schedule_landing();
        }
        info!("Logged out");
        cleared.map_err(ClientError::from)
    }

    pub async fn refresh(&self) -> ClientResult<()> {
        self.coordinator.force_refresh().await.map(|_| ())
    }

    pub fn apply_department_memberships(&self, departments: &[Department]) {
        self.identity.send_modify(|identity| {
            if let Some(identity) = identity {
                identity.apply_department_memberships(departments);
            }
        });
    }

    pub fn status(&self) -> AuthStatus {
        let store = self.coordinator.store();
        let access = store.access_token();
        AuthStatus {
            authenticated: self.gate.is_authenticated(),
            persistent: store.is_persistent(),
            identity: self.identity(),
            access_expires_at: access
                .as_deref()
                .and_then(inspect_access_token)
                .and_then(|claims| claims.expires_at()),
            access_token: access.as_deref().map(fingerprint),
            session_expires_at: store
                .marker()
                .filter(|marker| marker.is_valid_at(Utc::now()))
                .map(|marker| marker.expires),
        }
    }
}

/// Map a failed login/registration into the UI-facing auth taxonomy
fn map_auth_failure(err: ClientError, fallback: &str) -> ClientError {
    let (status, body) = match &err {
        ClientError::Transport(TransportError::Http { status, body }) => (*status, body.clone()),
        _ => return err,
    };
    let body = &body;

    match status {
        401 | 403 => {
            let message = extract_aggregate_message(body)
                .or_else(|| extract_field_error(body).map(|(_, message)| message))
                .unwrap_or_else(|| fallback.to_string());
            AuthError::InvalidCredentials(message).into()
        }
        400 | 422 => {
            let (field, message) = match extract_field_error(body) {
                Some((field, message)) => (Some(field), message),
                None => (None, extract_aggregate_message(body).unwrap_or_else(|| fallback.to_string())),
            };
            AuthError::Validation { field, message }.into()
        }
        _ => err,
    }
}

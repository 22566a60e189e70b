//! Client-side session lifecycle.
//!
//! `SessionManager` is the single owner of "who is logged in". It moves through
//! `Bootstrapping -> Authenticated | Unauthenticated` and then cycles between the last two.
//! Consumers (route guards, views) get a read-only [`SessionView`] backed by a `watch`
//! channel. The `loading` flag is raised for the duration of every lifecycle call and is
//! always lowered again, including on error paths.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{message_field, ClientError, ClientResult};
use crate::identity::Identity;
use crate::navigation::Navigator;
use crate::request::{ApiClient, RequestOptions};
use crate::token::token_from_cookie_header;

pub const GENERIC_LOGIN_ERROR: &str = "Unable to reach the server. Please check your connection and try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    Bootstrapping,
    Authenticated(Identity),
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub loading: bool,
}

impl SessionSnapshot {
    fn bootstrapping() -> Self { Self { phase: SessionPhase::Bootstrapping, loading: true } }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.phase {
            SessionPhase::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool { self.identity().is_some() }
}

/// Read-only projection of the session state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionView {
    rx: watch::Receiver<SessionSnapshot>,
}

impl SessionView {
    pub fn snapshot(&self) -> SessionSnapshot { self.rx.borrow().clone() }

    pub fn identity(&self) -> Option<Identity> { self.rx.borrow().identity().cloned() }

    pub fn is_authenticated(&self) -> bool { self.rx.borrow().is_authenticated() }

    pub fn is_loading(&self) -> bool { self.rx.borrow().loading }

    pub fn phase(&self) -> SessionPhase { self.rx.borrow().phase.clone() }

    /// Waits for the next state change. Returns false once the manager is gone.
    pub async fn changed(&mut self) -> bool { self.rx.changed().await.is_ok() }

    /// Waits until no lifecycle call is in flight and bootstrapping is over.
    pub async fn settled(&mut self) -> SessionSnapshot {
        let settled = self.rx.wait_for(|s| !s.loading && s.phase != SessionPhase::Bootstrapping).await.map(|s| s.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct LoginError {
    pub message: String,
}

impl LoginError {
    fn new(message: impl Into<String>) -> Self { Self { message: message.into() } }

    fn from_payload(payload: &Value) -> Self {
        Self::new(message_field(payload).unwrap_or_else(|| GENERIC_LOGIN_ERROR.to_string()))
    }

    fn from_client_error(err: &ClientError) -> Self {
        Self::new(err.server_message().unwrap_or_else(|| GENERIC_LOGIN_ERROR.to_string()))
    }
}

/// Raises `loading` on creation and lowers it on drop.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<SessionSnapshot>,
}

impl<'a> LoadingGuard<'a> {
    fn begin(state: &'a watch::Sender<SessionSnapshot>) -> Self {
        state.send_modify(|s| s.loading = true);
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) { self.state.send_modify(|s| s.loading = false); }
}

pub struct SessionManager {
    client: ApiClient,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<SessionSnapshot>,
}

impl SessionManager {
    pub fn new(client: ApiClient, navigator: Arc<dyn Navigator>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::bootstrapping());
        Self { client, navigator, state }
    }

    pub fn client(&self) -> &ApiClient { &self.client }

    pub fn view(&self) -> SessionView { SessionView { rx: self.state.subscribe() } }

    pub fn snapshot(&self) -> SessionSnapshot { self.state.borrow().clone() }

    pub fn identity(&self) -> Option<Identity> { self.state.borrow().identity().cloned() }

    pub fn is_authenticated(&self) -> bool { self.state.borrow().is_authenticated() }

    pub fn is_loading(&self) -> bool { self.state.borrow().loading }

    /// Startup session check. Never fails outward: any problem ends in `Unauthenticated`.
    pub async fn initialize(&self) {
        let _loading = LoadingGuard::begin(&self.state);
        let endpoint = self.client.config().endpoints.session.clone();
        match self.client.get(&endpoint).await {
            Ok(payload) => match Identity::from_payload(&payload) {
                Some(identity) => {
                    self.persist_token(&payload);
                    info!(target: "freelance::session", user = %identity.id, role = %identity.role, "session restored");
                    self.set_identity(identity);
                }
                None => {
                    info!(target: "freelance::session", "no active session");
                    self.force_logout();
                }
            },
            Err(e) => {
                warn!(target: "freelance::session", error = %e, "session check failed");
                self.force_logout();
            }
        }
    }

    /// Authenticates and navigates to the role's home. On failure the current identity is left untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, LoginError> {
        let _loading = LoadingGuard::begin(&self.state);
        let email = email.to_lowercase();
        let config = self.client.config();
        let body = serde_json::json!({ "email": email, "password": password });
        let options = RequestOptions::post(Some(body)).without_refresh();

        let payload = match self.client.request(&config.endpoints.login, options).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(target: "freelance::session", %email, error = %e, "login failed");
                return Err(LoginError::from_client_error(&e));
            }
        };
        let Some(identity) = Identity::from_payload(&payload) else {
            warn!(target: "freelance::session", %email, "login response without user");
            return Err(LoginError::from_payload(&payload));
        };

        self.persist_token(&payload);
        self.set_identity(identity.clone());
        let home = identity.role.home_route(&config.routes);
        info!(target: "freelance::session", user = %identity.id, role = %identity.role, %home, "logged in");
        self.navigator.navigate(home);
        Ok(identity)
    }

    /// Ends the session locally regardless of whether the server call succeeds.
    pub async fn logout(&self) {
        let _loading = LoadingGuard::begin(&self.state);
        let endpoint = self.client.config().endpoints.logout.clone();
        if let Err(e) = self.client.post(&endpoint, None).await {
            warn!(target: "freelance::session", error = %e, "server logout failed; clearing local session anyway");
        }
        self.force_logout();
    }

    /// Drops identity, token and CSRF cookies, then navigates to the login route. Idempotent.
    pub fn force_logout(&self) {
        self.state.send_modify(|s| s.phase = SessionPhase::Unauthenticated);
        self.client.tokens().clear();
        let config = self.client.config();
        let cookies = self.client.cookies();
        cookies.expire(&config.cookies.access);
        cookies.expire(&config.cookies.refresh);
        self.navigator.navigate(&config.routes.login);
    }

    /// Runs a request and forces logout if it failed because the session is gone.
    pub async fn call(&self, endpoint: &str, options: RequestOptions) -> ClientResult<Value> {
        let res = self.client.request(endpoint, options).await;
        if let Err(e) = &res {
            self.observe_error(e);
        }
        res
    }

    /// Returns true when `err` ended the session.
    pub fn observe_error(&self, err: &ClientError) -> bool {
        if !err.is_auth_failure() { return false; }
        if self.is_authenticated() {
            warn!(target: "freelance::session", error = %err, "session expired");
        }
        self.force_logout();
        true
    }

    fn set_identity(&self, identity: Identity) {
        self.state.send_modify(|s| s.phase = SessionPhase::Authenticated(identity));
    }

    /// Response-carried token first, then whatever the server put in the access cookie.
    fn persist_token(&self, payload: &Value) {
        let access_cookie = &self.client.config().cookies.access;
        let token = payload
            .get("csrf_token")
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| self.client.cookies().cookie_header().and_then(|h| token_from_cookie_header(&h, access_cookie)));
        self.client.tokens().store_if_present(token.as_deref());
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;

//! Route guarding on top of the session view.

use crate::config::Routes;
use crate::identity::Role;
use crate::session::{SessionPhase, SessionSnapshot, SessionView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session state is not authoritative yet; render a placeholder.
    Pending,
    Allow,
    Redirect(String),
}

/// Decides access for a view restricted to `allowed` roles (empty = any signed-in user).
/// Signed-out users go to the login route, role mismatches go to their own home.
pub fn check(snapshot: &SessionSnapshot, allowed: &[Role], routes: &Routes) -> GuardDecision {
    if snapshot.loading || snapshot.phase == SessionPhase::Bootstrapping {
        return GuardDecision::Pending;
    }
    let Some(identity) = snapshot.identity() else { return GuardDecision::Redirect(routes.login.clone()); };
    if allowed.is_empty() || allowed.contains(&identity.role) {
        return GuardDecision::Allow;
    }
    GuardDecision::Redirect(identity.role.home_route(routes).to_string())
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    view: SessionView,
    routes: Routes,
}

impl RouteGuard {
    pub fn new(view: SessionView, routes: Routes) -> Self { Self { view, routes } }

    pub fn check(&self, allowed: &[Role]) -> GuardDecision { check(&self.view.snapshot(), allowed, &self.routes) }
}

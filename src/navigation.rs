//! Navigation seam. The session manager decides *where* to go after login, logout or
//! expiry; the embedding UI decides *how* to get there.

use std::sync::Arc;

use parking_lot::Mutex;

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Keeps every navigation in order. Useful for shells and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    history: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self { Self::default() }

    pub fn history(&self) -> Vec<String> { self.history.lock().clone() }

    pub fn last(&self) -> Option<String> { self.history.lock().last().cloned() }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) { self.history.lock().push(route.to_string()); }
}

/// Logs the target route and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, route: &str) {
        tracing::info!(target: "freelance::navigation", %route, "navigate");
    }
}

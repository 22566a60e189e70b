//! Client configuration: backend base URL, auth endpoint paths, the dashboard route table
//! and the CSRF cookie/header names. Defaults match the dashboard backend; `from_env`
//! overlays the handful of values that differ between deployments.

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const ENV_API_URL: &str = "FREELANCE_API_URL";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "FREELANCE_REQUEST_TIMEOUT_MS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub session: String,
    pub login: String,
    pub logout: String,
    pub refresh: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            session: "/api/auth/session".into(),
            login: "/api/auth/login".into(),
            logout: "/api/auth/logout".into(),
            refresh: "/api/auth/refresh".into(),
        }
    }
}

/// Client-side navigation targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Routes {
    pub login: String,
    pub admin_home: String,
    pub manager_home: String,
    pub freelancer_home: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            login: "/login".into(),
            admin_home: "/admin/dashboard".into(),
            manager_home: "/manager/dashboard".into(),
            freelancer_home: "/freelancer/dashboard".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CookieNames {
    pub access: String,
    pub refresh: String,
}

impl Default for CookieNames {
    fn default() -> Self { Self { access: "csrf_access_token".into(), refresh: "csrf_refresh_token".into() } }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub endpoints: Endpoints,
    pub routes: Routes,
    pub cookies: CookieNames,
    pub csrf_header: String,
    /// Deadline applied to every pipeline call that does not set its own.
    pub request_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            endpoints: Endpoints::default(),
            routes: Routes::default(),
            cookies: CookieNames::default(),
            csrf_header: "X-CSRF-TOKEN".into(),
            request_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self { Self { base_url: base_url.into(), ..Default::default() } }

    /// Defaults overlaid with `FREELANCE_API_URL` and `FREELANCE_REQUEST_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() { cfg.base_url = url.trim().to_string(); }
        }
        if let Ok(ms) = std::env::var(ENV_REQUEST_TIMEOUT_MS) {
            match ms.trim().parse::<u64>() {
                Ok(v) if v > 0 => cfg.request_timeout_ms = Some(v),
                _ => tracing::warn!(target: "freelance::config", value = %ms, "ignoring invalid {}", ENV_REQUEST_TIMEOUT_MS),
            }
        }
        cfg
    }

    pub fn request_timeout(&self) -> Option<Duration> { self.request_timeout_ms.map(Duration::from_millis) }

    pub fn base(&self) -> ClientResult<Url> {
        Url::parse(&self.base_url).map_err(|e| ClientError::InvalidRequest(format!("invalid base URL '{}': {}", self.base_url, e)))
    }

    /// Resolves an endpoint path against the base URL; absolute URLs pass through.
    pub fn endpoint_url(&self, endpoint: &str) -> ClientResult<Url> {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Url::parse(endpoint).map_err(|e| ClientError::InvalidRequest(format!("invalid URL '{}': {}", endpoint, e)));
        }
        self.base()?
            .join(endpoint)
            .map_err(|e| ClientError::InvalidRequest(format!("invalid endpoint '{}': {}", endpoint, e)))
    }
}

//! Authenticated request pipeline.
//!
//! Every backend call goes through [`ApiClient::request`]: it attaches the JSON content type
//! and the CSRF header, sends cookies through the transport, and recovers from a first 401 by
//! calling the refresh endpoint once and re-issuing the call. A retried call never refreshes
//! again; its 401 is returned to the caller as-is.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::token::{CookieSource, TokenStore};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Which send of a logical call this is. Only `First` may trigger a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retried,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Refresh once and retry when the first send answers 401.
    #[default]
    OnUnauthorized,
    /// Surface a 401 directly (credential checks such as login).
    Never,
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    /// Extra headers. `Content-Type` and the CSRF header are always set by the pipeline.
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub refresh: RefreshPolicy,
    /// Overrides the configured deadline. The in-flight call is dropped when it expires.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn get() -> Self { Self::default() }
    pub fn post(body: Option<Value>) -> Self { Self { method: Method::POST, body, ..Default::default() } }
    pub fn put(body: Value) -> Self { Self { method: Method::PUT, body: Some(body), ..Default::default() } }
    pub fn patch(body: Value) -> Self { Self { method: Method::PATCH, body: Some(body), ..Default::default() } }
    pub fn delete() -> Self { Self { method: Method::DELETE, ..Default::default() } }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_refresh(mut self) -> Self {
        self.refresh = RefreshPolicy::Never;
        self
    }
}

enum Step {
    Done(Value),
    NeedsRefresh(String),
}

#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config: Arc::new(config), transport, tokens: TokenStore::new() }
    }

    pub fn with_token_store(mut self, tokens: TokenStore) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn config(&self) -> &ClientConfig { &self.config }

    pub fn tokens(&self) -> &TokenStore { &self.tokens }

    pub fn cookies(&self) -> Arc<dyn CookieSource> { self.transport.cookies() }

    /// CSRF token from the store, falling back to the access cookie.
    pub fn current_token(&self) -> Option<String> {
        self.tokens.resolve(self.transport.cookies().as_ref(), &self.config.cookies.access)
    }

    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> ClientResult<Value> {
        match options.timeout.or_else(|| self.config.request_timeout()) {
            Some(limit) => match tokio::time::timeout(limit, self.run(endpoint, &options)).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(target: "freelance::request", %endpoint, timeout_ms = limit.as_millis() as u64, "request deadline exceeded");
                    Err(ClientError::Timeout)
                }
            },
            None => self.run(endpoint, &options).await,
        }
    }

    pub async fn request_as<T: DeserializeOwned>(&self, endpoint: &str, options: RequestOptions) -> ClientResult<T> {
        let value = self.request(endpoint, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get(&self, endpoint: &str) -> ClientResult<Value> { self.request(endpoint, RequestOptions::get()).await }

    pub async fn post(&self, endpoint: &str, body: Option<Value>) -> ClientResult<Value> {
        self.request(endpoint, RequestOptions::post(body)).await
    }

    pub async fn put(&self, endpoint: &str, body: Value) -> ClientResult<Value> { self.request(endpoint, RequestOptions::put(body)).await }

    pub async fn patch(&self, endpoint: &str, body: Value) -> ClientResult<Value> {
        self.request(endpoint, RequestOptions::patch(body)).await
    }

    pub async fn delete(&self, endpoint: &str) -> ClientResult<Value> { self.request(endpoint, RequestOptions::delete()).await }

    async fn run(&self, endpoint: &str, options: &RequestOptions) -> ClientResult<Value> {
        match self.attempt(endpoint, options, Attempt::First).await? {
            Step::Done(v) => Ok(v),
            Step::NeedsRefresh(_) => {
                self.refresh().await?;
                match self.attempt(endpoint, options, Attempt::Retried).await? {
                    Step::Done(v) => Ok(v),
                    Step::NeedsRefresh(body) => Err(ClientError::http(401, body)),
                }
            }
        }
    }

    async fn attempt(&self, endpoint: &str, options: &RequestOptions, attempt: Attempt) -> ClientResult<Step> {
        let url = self.config.endpoint_url(endpoint)?;
        let request = HttpRequest {
            method: options.method.clone(),
            url,
            headers: self.build_headers(&options.headers),
            body: options.body.clone(),
        };
        let response = self.transport.execute(request).await?;
        debug!(target: "freelance::request", method = %options.method, %endpoint, status = response.status, ?attempt, "response");

        if response.is_success() {
            return decode_success(&response).map(Step::Done);
        }
        if response.status == 401 && attempt == Attempt::First && options.refresh == RefreshPolicy::OnUnauthorized {
            return Ok(Step::NeedsRefresh(response.body));
        }
        if response.status == 401 && attempt == Attempt::Retried {
            warn!(target: "freelance::request", %endpoint, "unauthorized after refresh");
        }
        Err(ClientError::http(response.status, response.body))
    }

    /// One POST to the refresh endpoint. A rejected refresh means the session is gone.
    async fn refresh(&self) -> ClientResult<()> {
        let url = self.config.endpoint_url(&self.config.endpoints.refresh)?;
        let request = HttpRequest { method: Method::POST, url, headers: self.build_headers(&[]), body: None };
        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            warn!(target: "freelance::request", status = response.status, "token refresh rejected");
            return Err(ClientError::SessionExpired);
        }
        let payload = decode_success(&response).unwrap_or(Value::Null);
        let rotated = self.tokens.store_if_present(payload.get("csrf_token").and_then(|v| v.as_str()));
        info!(target: "freelance::request", rotated, "session refreshed");
        Ok(())
    }

    fn build_headers(&self, extra: &[(String, String)]) -> Vec<(String, String)> {
        let csrf_header = self.config.csrf_header.as_str();
        let mut headers: Vec<(String, String)> = extra
            .iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case("content-type") && !k.eq_ignore_ascii_case(csrf_header))
            .cloned()
            .collect();
        headers.push(("Content-Type".into(), "application/json".into()));
        if let Some(token) = self.current_token() {
            headers.push((csrf_header.to_string(), token));
        }
        headers
    }
}

/// JSON bodies are parsed; anything else is an empty result.
fn decode_success(response: &HttpResponse) -> ClientResult<Value> {
    if !response.is_json() || response.body.trim().is_empty() { return Ok(Value::Null); }
    Ok(serde_json::from_str(&response.body)?)
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod request_tests;

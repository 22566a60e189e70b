//! Transport seam between the request pipeline and the wire.
//!
//! `ApiClient` only ever sees `HttpRequest`/`HttpResponse`; the reqwest-backed transport
//! owns the cookie jar so the server session cookie travels on every call, and exposes the
//! same jar as a `CookieSource` for the CSRF cookie fallback.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Url};

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::token::CookieSource;

/// One outbound call as handed to the transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<String>) -> Self {
        Self { status, content_type: content_type.map(str::to_string), body: body.into() }
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, Some("application/json"), value.to_string())
    }

    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| {
                let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
                mime == "application/json" || mime.ends_with("+json")
            })
            .unwrap_or(false)
    }
}

pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, ClientResult<HttpResponse>>;

    /// Cookies currently held for the backend origin.
    fn cookies(&self) -> Arc<dyn CookieSource>;
}

/// Cookie jar view scoped to one origin.
#[derive(Clone)]
pub struct JarCookies {
    jar: Arc<Jar>,
    origin: Url,
}

impl JarCookies {
    pub fn new(jar: Arc<Jar>, origin: Url) -> Self { Self { jar, origin } }
}

impl CookieSource for JarCookies {
    fn cookie_header(&self) -> Option<String> {
        self.jar.cookies(&self.origin).and_then(|v| v.to_str().ok().map(str::to_string))
    }

    fn expire(&self, name: &str) {
        let expired = format!("{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/", name);
        self.jar.add_cookie_str(&expired, &self.origin);
    }
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    cookies: Arc<JarCookies>,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let origin = config.base()?;
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder().cookie_provider(Arc::clone(&jar)).build()?;
        Ok(Self { client, cookies: Arc::new(JarCookies::new(jar, origin)) })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, ClientResult<HttpResponse>> {
        Box::pin(async move {
            let mut rb = self.client.request(request.method, request.url);
            for (k, v) in &request.headers {
                rb = rb.header(k.as_str(), v.as_str());
            }
            if let Some(body) = &request.body {
                rb = rb.body(serde_json::to_vec(body)?);
            }
            let resp = rb.send().await?;
            let status = resp.status().as_u16();
            let content_type = resp.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_string);
            let body = resp.text().await?;
            Ok(HttpResponse { status, content_type, body })
        })
    }

    fn cookies(&self) -> Arc<dyn CookieSource> { self.cookies.clone() }
}

//! Scripted in-memory transport for exercising the request pipeline and the session
//! manager without a backend.
//!
//! # Example
//!
//! ```ignore
//! let fake = Arc::new(FakeTransport::new());
//! fake.push("/api/auth/login", HttpResponse::json(200, &json!({"user": {"id": 1, "role": "admin"}})));
//! let client = ApiClient::new(ClientConfig::default(), fake.clone());
//! client.post("/api/auth/login", None).await?;
//! assert_eq!(fake.count("/api/auth/login"), 1);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use crate::error::{ClientError, ClientResult};
use crate::token::{CookieSource, MemoryCookies};
use crate::transport::{HttpRequest, HttpResponse, Transport};

#[derive(Debug, Clone)]
enum Scripted {
    Respond { response: HttpResponse, set_cookies: Vec<(String, String)>, delay: Option<Duration> },
    Fail(ClientError),
}

#[derive(Debug, Default)]
struct Route {
    queue: VecDeque<Scripted>,
    fallback: Option<Scripted>,
}

/// Responses are keyed by URL path and consumed in order; once a path's queue is empty its
/// `always` response (if any) is served, otherwise a 404.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<String, Route>>,
    sent: Mutex<Vec<HttpRequest>>,
    cookies: MemoryCookies,
}

impl FakeTransport {
    pub fn new() -> Self { Self::default() }

    fn enqueue(&self, path: &str, item: Scripted) {
        self.routes.lock().entry(path.to_string()).or_default().queue.push_back(item);
    }

    pub fn push(&self, path: &str, response: HttpResponse) {
        self.enqueue(path, Scripted::Respond { response, set_cookies: Vec::new(), delay: None });
    }

    /// Queues a response that also drops cookies into the jar, like a `Set-Cookie` header.
    pub fn push_with_cookies(&self, path: &str, response: HttpResponse, cookies: &[(&str, &str)]) {
        let set_cookies = cookies.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        self.enqueue(path, Scripted::Respond { response, set_cookies, delay: None });
    }

    pub fn push_delayed(&self, path: &str, delay: Duration, response: HttpResponse) {
        self.enqueue(path, Scripted::Respond { response, set_cookies: Vec::new(), delay: Some(delay) });
    }

    pub fn push_error(&self, path: &str, error: ClientError) { self.enqueue(path, Scripted::Fail(error)); }

    pub fn always(&self, path: &str, response: HttpResponse) {
        self.routes.lock().entry(path.to_string()).or_default().fallback =
            Some(Scripted::Respond { response, set_cookies: Vec::new(), delay: None });
    }

    pub fn memory_cookies(&self) -> &MemoryCookies { &self.cookies }

    /// Every request handed to the transport, in send order.
    pub fn sent(&self) -> Vec<HttpRequest> { self.sent.lock().clone() }

    pub fn sent_to(&self, path: &str) -> Vec<HttpRequest> {
        self.sent.lock().iter().filter(|r| r.url.path() == path).cloned().collect()
    }

    pub fn count(&self, path: &str) -> usize { self.sent.lock().iter().filter(|r| r.url.path() == path).count() }

    fn next_for(&self, path: &str) -> Option<Scripted> {
        let mut routes = self.routes.lock();
        let route = routes.get_mut(path)?;
        route.queue.pop_front().or_else(|| route.fallback.clone())
    }
}

impl Transport for FakeTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, ClientResult<HttpResponse>> {
        Box::pin(async move {
            let path = request.url.path().to_string();
            self.sent.lock().push(request);
            match self.next_for(&path) {
                Some(Scripted::Respond { response, set_cookies, delay }) => {
                    if let Some(d) = delay {
                        tokio::time::sleep(d).await;
                    }
                    for (k, v) in set_cookies {
                        self.cookies.set(k, v);
                    }
                    Ok(response)
                }
                Some(Scripted::Fail(e)) => Err(e),
                None => Ok(HttpResponse::new(404, Some("text/plain"), format!("no scripted response for {}", path))),
            }
        })
    }

    fn cookies(&self) -> Arc<dyn CookieSource> { Arc::new(self.cookies.clone()) }
}

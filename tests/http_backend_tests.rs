//! End-to-end tests over real HTTP against an in-process axum backend that speaks the
//! dashboard auth protocol: cookie session, mirrored CSRF cookie, refresh rotation.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use freelance_client::navigation::RecordingNavigator;
use freelance_client::token::token_from_cookie_header;
use freelance_client::{ApiClient, ClientConfig, ClientError, ReqwestTransport, Role, SessionManager};

#[derive(Debug, Default)]
struct BackendState {
    csrf: String,
    access_valid: bool,
    refresh_valid: bool,
    refresh_calls: usize,
    seen_csrf: Vec<Option<String>>,
}

#[derive(Clone, Default)]
struct Backend(Arc<Mutex<BackendState>>);

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get("cookie").and_then(|v| v.to_str().ok()).and_then(|h| token_from_cookie_header(h, name))
}

fn csrf_header(headers: &HeaderMap) -> Option<String> {
    headers.get("x-csrf-token").and_then(|v| v.to_str().ok()).map(str::to_string)
}

fn unauthorized(msg: &str) -> Response { (StatusCode::UNAUTHORIZED, Json(json!({ "msg": msg }))).into_response() }

fn authorized(b: &BackendState, headers: &HeaderMap) -> bool {
    b.access_valid && cookie(headers, "access_token_cookie").as_deref() == Some("a1")
}

async fn login(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    if body["email"] != "ada@example.com" || body["password"] != "pw" {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid credentials"}))).into_response();
    }
    let mut b = backend.0.lock();
    b.csrf = "c1".into();
    b.access_valid = true;
    b.refresh_valid = true;
    (
        AppendHeaders([
            (SET_COOKIE, "access_token_cookie=a1; HttpOnly; Path=/"),
            (SET_COOKIE, "csrf_access_token=c1; Path=/"),
            (SET_COOKIE, "csrf_refresh_token=r1; Path=/"),
        ]),
        Json(json!({"user": {"id": 1, "role": "admin", "username": "ada", "email": "ada@example.com"}})),
    )
        .into_response()
}

async fn session(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    let b = backend.0.lock();
    if !authorized(&b, &headers) { return unauthorized("Missing or expired token"); }
    Json(json!({"user": {"id": 1, "role": "admin"}, "csrf_token": b.csrf})).into_response()
}

async fn refresh(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    let mut b = backend.0.lock();
    b.refresh_calls += 1;
    if !b.refresh_valid || csrf_header(&headers).as_deref() != Some(b.csrf.as_str()) {
        return unauthorized("Refresh token expired");
    }
    b.csrf = "c2".into();
    b.access_valid = true;
    (AppendHeaders([(SET_COOKIE, "csrf_access_token=c2; Path=/")]), Json(json!({"csrf_token": "c2"}))).into_response()
}

async fn logout(State(backend): State<Backend>) -> Response {
    let mut b = backend.0.lock();
    b.access_valid = false;
    b.refresh_valid = false;
    (
        AppendHeaders([(SET_COOKIE, "access_token_cookie=; Max-Age=0; Path=/")]),
        Json(json!({"status": "ok"})),
    )
        .into_response()
}

async fn list_projects(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    let mut b = backend.0.lock();
    b.seen_csrf.push(csrf_header(&headers));
    if !authorized(&b, &headers) { return unauthorized("Token has expired"); }
    Json(json!([{"id": 1, "name": "Atlas"}])).into_response()
}

async fn create_project(State(backend): State<Backend>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let b = backend.0.lock();
    if !authorized(&b, &headers) { return unauthorized("Token has expired"); }
    if csrf_header(&headers).as_deref() != Some(b.csrf.as_str()) {
        return (StatusCode::FORBIDDEN, "CSRF double submit tokens do not match").into_response();
    }
    (StatusCode::CREATED, Json(json!({"id": 2, "name": body["name"]}))).into_response()
}

async fn spawn_backend() -> (String, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/session", get(session))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/projects", get(list_projects).post(create_project))
        .with_state(backend.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), backend)
}

fn session_for(base: &str) -> (SessionManager, RecordingNavigator) {
    let config = ClientConfig::new(base);
    let transport = ReqwestTransport::new(&config).unwrap();
    let nav = RecordingNavigator::new();
    let client = ApiClient::new(config, Arc::new(transport));
    (SessionManager::new(client, Arc::new(nav.clone())), nav)
}

#[tokio::test]
async fn full_lifecycle_over_http() {
    let (base, backend) = spawn_backend().await;
    let (sm, nav) = session_for(&base);

    sm.initialize().await;
    assert!(!sm.is_authenticated());
    assert_eq!(nav.last().as_deref(), Some("/login"));

    let identity = sm.login("Ada@Example.com", "pw").await.unwrap();
    assert_eq!(identity.role, Role::Admin);
    assert_eq!(nav.last().as_deref(), Some("/admin/dashboard"));
    // No token in the body: the mirrored cookie supplies it.
    assert_eq!(sm.client().tokens().get().as_deref(), Some("c1"));

    let projects = sm.call("/api/projects", Default::default()).await.unwrap();
    assert_eq!(projects[0]["name"], "Atlas");

    let created = sm.client().post("/api/projects", Some(json!({"name": "Borealis"}))).await.unwrap();
    assert_eq!(created["id"], 2);

    // Access token expires server-side; the pipeline refreshes once and retries.
    let refreshes_before = {
        let mut b = backend.0.lock();
        b.access_valid = false;
        b.refresh_calls
    };
    let projects = sm.call("/api/projects", Default::default()).await.unwrap();
    assert_eq!(projects.as_array().map(|a| a.len()), Some(1));
    assert_eq!(sm.client().tokens().get().as_deref(), Some("c2"));
    {
        let b = backend.0.lock();
        assert_eq!(b.refresh_calls, refreshes_before + 1);
        let n = b.seen_csrf.len();
        assert_eq!(b.seen_csrf[n - 2].as_deref(), Some("c1"));
        assert_eq!(b.seen_csrf[n - 1].as_deref(), Some("c2"));
    }

    // Refresh no longer possible: the call fails and the session is torn down.
    {
        let mut b = backend.0.lock();
        b.access_valid = false;
        b.refresh_valid = false;
    }
    let err = sm.call("/api/projects", Default::default()).await.unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired));
    assert!(!sm.is_authenticated());
    assert_eq!(sm.client().tokens().get(), None);
    assert_eq!(nav.last().as_deref(), Some("/login"));
    let jar = sm.client().cookies().cookie_header().unwrap_or_default();
    assert!(!jar.contains("csrf_access_token"), "jar still holds {}", jar);
    assert!(!jar.contains("csrf_refresh_token"), "jar still holds {}", jar);
}

#[tokio::test]
async fn wrong_password_reports_server_message() {
    let (base, backend) = spawn_backend().await;
    let (sm, nav) = session_for(&base);

    let err = sm.login("ada@example.com", "nope").await.unwrap_err();
    assert_eq!(err.message, "Invalid credentials");
    assert!(!sm.is_authenticated());
    assert!(nav.history().is_empty());
    assert_eq!(backend.0.lock().refresh_calls, 0);
}

#[tokio::test]
async fn restored_session_uses_body_token() {
    let (base, _backend) = spawn_backend().await;
    let (sm, _) = session_for(&base);
    sm.login("ada@example.com", "pw").await.unwrap();
    sm.client().tokens().clear();

    sm.initialize().await;
    assert!(sm.is_authenticated());
    assert_eq!(sm.client().tokens().get().as_deref(), Some("c1"));
}

#[tokio::test]
async fn logout_against_unreachable_server_still_clears() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let (sm, nav) = session_for(&format!("http://{}", addr));
    sm.client().tokens().set("stale");

    sm.logout().await;

    assert!(!sm.is_authenticated());
    assert!(!sm.is_loading());
    assert_eq!(sm.client().tokens().get(), None);
    assert_eq!(nav.last().as_deref(), Some("/login"));
}

#[tokio::test]
async fn login_against_unreachable_server_reports_connectivity() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let (sm, _) = session_for(&format!("http://{}", addr));

    let err = sm.login("ada@example.com", "pw").await.unwrap_err();
    assert_eq!(err.message, freelance_client::session::GENERIC_LOGIN_ERROR);
}

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};

use carecrm::config::Config;
use carecrm::navigation::RecordingNavigator;
use carecrm::notice::RecordingNotifier;
use carecrm::state::SessionContext;
use carecrm::storage::backend::MemoryStorage;

pub const EMAIL: &str = "rep@pharma.example";
pub const PASSWORD: &str = "correct-horse";
pub const LOGIN_ROUTE: &str = "/login";
pub const REDIRECT_DELAY: Duration = Duration::from_millis(150);

/// In-process stand-in for the CRM API.
pub struct MockApi {
    valid_token: Mutex<String>,
    pub refresh_calls: AtomicUsize,
    pub refresh_completed: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub menu_calls: AtomicUsize,
    pub refresh_fails: AtomicBool,
    pub flaky_failures: AtomicUsize,
}

impl MockApi {
    fn new() -> Self {
        Self {
            valid_token: Mutex::new("access-0".to_string()),
            refresh_calls: AtomicUsize::new(0),
            refresh_completed: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            menu_calls: AtomicUsize::new(0),
            refresh_fails: AtomicBool::new(false),
            flaky_failures: AtomicUsize::new(0),
        }
    }

    /// Invalidates every token issued so far.
    pub fn expire_tokens(&self) {
        *self.valid_token.lock().unwrap() = "revoked".to_string();
    }

    pub fn valid_token(&self) -> String {
        self.valid_token.lock().unwrap().clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.valid_token());
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == expected)
    }
}

type Shared = State<Arc<MockApi>>;

fn error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": { "code": code, "message": message } })),
    )
        .into_response()
}

fn unauthorized() -> Response {
    error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Token expired")
}

fn user() -> Value {
    json!({
        "id": "u-1",
        "name": "Rita Rep",
        "email": EMAIL,
        "role": { "id": "r-1", "name": "Medical Rep" },
        "status": "active"
    })
}

async fn login(State(api): Shared, Json(body): Json<Value>) -> Response {
    if body["email"] != EMAIL || body["password"] != PASSWORD {
        return error(
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            "Invalid email or password",
        );
    }
    *api.valid_token.lock().unwrap() = "access-1".to_string();
    Json(json!({
        "success": true,
        "data": {
            "user": user(),
            "token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600
        }
    }))
    .into_response()
}

async fn refresh(State(api): Shared, Json(body): Json<Value>) -> Response {
    let call = api.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
    tokio::time::sleep(Duration::from_millis(200)).await;

    if api.refresh_fails.load(Ordering::SeqCst) || body["refresh_token"].as_str().is_none() {
        api.refresh_completed.fetch_add(1, Ordering::SeqCst);
        return error(StatusCode::UNAUTHORIZED, "INVALID_REFRESH_TOKEN", "Refresh token revoked");
    }

    let token = format!("access-renewed-{}", call);
    *api.valid_token.lock().unwrap() = token.clone();
    api.refresh_completed.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "success": true,
        "data": {
            "token": token,
            "refresh_token": format!("refresh-renewed-{}", call),
            "expires_in": 3600
        }
    }))
    .into_response()
}

async fn logout(State(api): Shared) -> Response {
    api.logout_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "success": true, "data": null })).into_response()
}

async fn patients(State(api): Shared, headers: HeaderMap) -> Response {
    if !api.authorized(&headers) {
        return unauthorized();
    }
    patient_page()
}

/// Like `/patients`, but an unauthorized caller only gets its 401 after a
/// refresh has completed on the server.
async fn patients_late(State(api): Shared, headers: HeaderMap) -> Response {
    if api.authorized(&headers) {
        return patient_page();
    }
    while api.refresh_completed.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(150)).await;
    unauthorized()
}

fn patient_page() -> Response {
    Json(json!({
        "success": true,
        "data": [
            { "id": "p-1", "name": "Dr. Alves" },
            { "id": "p-2", "name": "Dr. Brito" }
        ],
        "meta": {
            "pagination": {
                "page": 1,
                "per_page": 20,
                "total": 2,
                "total_pages": 1,
                "has_next": false,
                "has_prev": false
            }
        }
    }))
    .into_response()
}

async fn always_unauthorized() -> Response {
    unauthorized()
}

async fn create_user() -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "success": false,
            "error": {
                "code": "VALIDATION_ERROR",
                "message": "Invalid input",
                "field_errors": [
                    { "field": "email", "message": "must be a valid email" },
                    { "field": "password", "message": "too short" }
                ]
            }
        })),
    )
        .into_response()
}

async fn missing() -> Response {
    error(StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found")
}

async fn html_error() -> Response {
    (
        StatusCode::BAD_GATEWAY,
        [(header::CONTENT_TYPE, "text/html")],
        "<html><body>Bad gateway</body></html>",
    )
        .into_response()
}

async fn flaky(State(api): Shared) -> Response {
    let remaining = api.flaky_failures.load(Ordering::SeqCst);
    if remaining > 0 {
        api.flaky_failures.store(remaining - 1, Ordering::SeqCst);
        return error(StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", "Try again later");
    }
    Json(json!({ "success": true, "data": ["ok"] })).into_response()
}

async fn menus(State(api): Shared, Path(user_id): Path<String>, headers: HeaderMap) -> Response {
    if !api.authorized(&headers) {
        return unauthorized();
    }
    api.menu_calls.fetch_add(1, Ordering::SeqCst);
    if user_id != "u-1" {
        return Json(json!({ "success": true, "data": [] })).into_response();
    }
    Json(json!({
        "success": true,
        "data": [
            { "id": "m-dash", "name": "Home", "url": "/dashboard", "icon": "home" },
            {
                "id": "m-crm",
                "name": "CRM",
                "children": [
                    {
                        "id": "m-patients",
                        "name": "Patients",
                        "url": "/patients",
                        "actions": [
                            { "code": "VIEW_PATIENTS", "access": true },
                            { "code": "DELETE_PATIENTS", "access": false }
                        ]
                    },
                    { "id": "m-visits", "name": "Visits", "url": "/visits" }
                ]
            }
        ]
    }))
    .into_response()
}

/// Starts the mock API on an ephemeral port and returns its origin.
pub async fn spawn_api() -> (Arc<MockApi>, String) {
    let api = Arc::new(MockApi::new());
    let v1 = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/patients", get(patients))
        .route("/patients/late", get(patients_late))
        .route("/always-unauthorized", get(always_unauthorized))
        .route("/users", post(create_user))
        .route("/missing", get(missing).delete(missing))
        .route("/html-error", get(html_error))
        .route("/flaky", get(flaky))
        .route("/menus/user/{id}", get(menus));
    let app = Router::new().nest("/api/v1", v1).with_state(Arc::clone(&api));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (api, origin)
}

pub fn test_config(origin: &str) -> Config {
    let mut config = Config::new(origin);
    config.request_timeout = Duration::from_secs(5);
    config.redirect_delay = REDIRECT_DELAY;
    config.rehydrate_timeout = Duration::from_millis(100);
    config.login_route = LOGIN_ROUTE.to_string();
    config
}

/// A wired client against a fresh mock API.
pub struct Harness {
    pub api: Arc<MockApi>,
    pub origin: String,
    pub storage: Arc<MemoryStorage>,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<RecordingNavigator>,
    pub context: SessionContext,
}

impl Harness {
    /// A context that has not been rehydrated yet.
    pub async fn unstarted() -> Self {
        let (api, origin) = spawn_api().await;
        Self::on(api, origin, Arc::new(MemoryStorage::new()))
    }

    /// A rehydrated context.
    pub async fn started() -> Self {
        let harness = Self::unstarted().await;
        harness.context.start().await;
        harness
    }

    /// A rehydrated, logged-in context.
    pub async fn logged_in() -> Self {
        let harness = Self::started().await;
        harness.context.store.login(EMAIL, PASSWORD).await.unwrap();
        harness
    }

    /// A second context sharing this one's API and storage, as after a restart.
    pub fn restart(&self) -> Self {
        Self::on(Arc::clone(&self.api), self.origin.clone(), self.storage.clone())
    }

    fn on(api: Arc<MockApi>, origin: String, storage: Arc<MemoryStorage>) -> Self {
        let notifier = Arc::new(RecordingNotifier::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let context = SessionContext::new(
            test_config(&origin),
            storage.clone(),
            notifier.clone(),
            navigator.clone(),
        )
        .unwrap();
        Self {
            api,
            origin,
            storage,
            notifier,
            navigator,
            context,
        }
    }
}

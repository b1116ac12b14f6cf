#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};

use tenant_console::config::ClientConfig;
use tenant_console::navigation::RecordingNavigator;
use tenant_console::session::{MemoryStorage, StorageBackend};
use tenant_console::Console;

pub const EMAIL: &str = "a@b.com";
pub const PASSWORD: &str = "secret";
pub const FIRST_ACCESS: &str = "T1";
pub const REFRESHED_ACCESS: &str = "T2";
pub const REFRESH_TOKEN: &str = "R1";

static TRACING: Once = Once::new();

/// Opt-in log output for debugging: `RUST_LOG=tenant_console=debug cargo test`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Issue,
    Reject,
    OmitAccess,
}

pub struct MockState {
    valid_access: Mutex<Option<String>>,
    refresh_mode: Mutex<RefreshMode>,
    refresh_delay: Mutex<Duration>,
    profile: Mutex<Value>,
    profile_rejected: Mutex<bool>,
    departments: Mutex<Value>,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> Result<Self> {
        init_tracing();

        let state = Arc::new(MockState {
            valid_access: Mutex::new(Some(FIRST_ACCESS.to_string())),
            refresh_mode: Mutex::new(RefreshMode::Issue),
            refresh_delay: Mutex::new(Duration::ZERO),
            profile: Mutex::new(json!({
                "user_id": 7,
                "email": EMAIL,
                "full_name": "Ada Admin",
                "is_root_admin": false,
                "is_reseller_admin": false,
                "is_department_admin": false
            })),
            profile_rejected: Mutex::new(false),
            departments: Mutex::new(json!([
                {"department_id": 1, "name": "Ops", "admins": [{"user_id": 7, "email": EMAIL}],
                 "users": [{"user_id": 7, "email": EMAIL}, {"user_id": 8, "email": "c@d.com"}]},
                {"department_id": 2, "name": "Sales", "admins": [], "users": []}
            ])),
            requests: Mutex::new(Vec::new()),
        });

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind mock backend")?;
        let app = Router::new().fallback(dispatch).with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
        })
    }

    /// Console wired to this backend with short redirect delays
    pub fn console_with(&self, storage: Arc<dyn StorageBackend>) -> Result<(Console, Arc<RecordingNavigator>)> {
        let mut config = ClientConfig::for_base_url(self.base_url.clone());
        config.api.request_timeout_secs = 5;
        config.navigation.redirect_delay_ms = 10;
        config.navigation.logout_redirect_delay_ms = 10;

        let navigator = Arc::new(RecordingNavigator::at("/dashboard"));
        let console = Console::init(config, storage, navigator.clone())?;
        Ok((console, navigator))
    }

    pub fn console(&self) -> Result<(Console, Arc<RecordingNavigator>)> {
        self.console_with(Arc::new(MemoryStorage::new()))
    }

    /// Invalidate every access token; the next refresh issues `T2`
    pub fn expire_access(&self) {
        *self.state.valid_access.lock().unwrap() = None;
    }

    pub fn set_refresh_mode(&self, mode: RefreshMode) {
        *self.state.refresh_mode.lock().unwrap() = mode;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.state.refresh_delay.lock().unwrap() = delay;
    }

    pub fn set_profile(&self, profile: Value) {
        *self.state.profile.lock().unwrap() = profile;
    }

    /// Answer every profile request with 401, even with a fresh token
    pub fn reject_profile(&self) {
        *self.state.profile_rejected.lock().unwrap() = true;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn refresh_calls(&self) -> usize {
        self.requests_to(Method::POST, "/token/refresh/").len()
    }
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn unauthorized() -> Response {
    reply(
        StatusCode::UNAUTHORIZED,
        json!({"detail": "Given token not valid for any token type", "code": "token_not_valid"}),
    )
}

async fn dispatch(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let path = uri.path().to_string();

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        authorization: authorization.clone(),
        body: body.clone(),
    });

    match (method.as_str(), path.as_str()) {
        ("POST", "/users/auth/login/") => handle_login(&state, &body),
        ("POST", "/users/auth/register/") => handle_register(&state, &body),
        ("POST", "/token/refresh/") => handle_refresh(&state, &body).await,
        _ => {
            let valid = state.valid_access.lock().unwrap().clone();
            let expected = valid.map(|token| format!("Bearer {}", token));
            if expected.is_none() || authorization != expected {
                return unauthorized();
            }
            protected(&state, &method, &path, uri.query(), &body)
        }
    }
}

fn issue_tokens(state: &MockState, user: Value) -> Response {
    *state.valid_access.lock().unwrap() = Some(FIRST_ACCESS.to_string());
    reply(
        StatusCode::OK,
        json!({"user": user, "tokens": {"access": FIRST_ACCESS, "refresh": REFRESH_TOKEN}}),
    )
}

fn handle_login(state: &MockState, body: &Value) -> Response {
    if body["email"] == EMAIL && body["password"] == PASSWORD {
        let profile = state.profile.lock().unwrap().clone();
        issue_tokens(state, profile)
    } else {
        reply(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "No active account found with the given credentials"}),
        )
    }
}

fn handle_register(state: &MockState, body: &Value) -> Response {
    if body["email"] == EMAIL {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"email": ["user with this email already exists."]}),
        );
    }
    if body["password"].as_str().map_or(true, |p| p.len() < 6) {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"non_field_errors": ["Password is too short."]}),
        );
    }
    let user = json!({
        "user_id": 50,
        "email": body["email"],
        "full_name": body["full_name"],
        "reseller_id": body.get("reseller_id").cloned().unwrap_or(Value::Null)
    });
    issue_tokens(state, user)
}

async fn handle_refresh(state: &MockState, body: &Value) -> Response {
    let delay = *state.refresh_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mode = *state.refresh_mode.lock().unwrap();
    match mode {
        RefreshMode::Reject => reply(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Token is blacklisted", "code": "token_not_valid"}),
        ),
        RefreshMode::OmitAccess => reply(StatusCode::OK, json!({"detail": "ok"})),
        RefreshMode::Issue if body["refresh"] == REFRESH_TOKEN => {
            *state.valid_access.lock().unwrap() = Some(REFRESHED_ACCESS.to_string());
            reply(StatusCode::OK, json!({"access": REFRESHED_ACCESS}))
        }
        RefreshMode::Issue => unauthorized(),
    }
}

fn protected(state: &MockState, method: &Method, path: &str, query: Option<&str>, body: &Value) -> Response {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (method.as_str(), segments.as_slice()) {
        ("GET", ["users", "profile"]) => {
            if *state.profile_rejected.lock().unwrap() {
                return unauthorized();
            }
            reply(StatusCode::OK, state.profile.lock().unwrap().clone())
        }

        ("GET", ["api", "departments", "departments"]) => {
            reply(StatusCode::OK, state.departments.lock().unwrap().clone())
        }
        ("POST", ["api", "departments", "departments"]) => {
            let mut created = body.clone();
            created["department_id"] = json!(99);
            reply(StatusCode::CREATED, created)
        }
        ("POST", ["api", "departments", "departments", _, "admins" | "users"]) => {
            reply(StatusCode::CREATED, json!({"message": "added"}))
        }
        ("DELETE", ["api", "departments", "departments", _, "admins" | "users"]) => {
            StatusCode::NO_CONTENT.into_response()
        }

        ("GET", ["api", "services", "packages"]) => {
            let mut packages = vec![json!({"id": 1, "name": "Basic", "price": "9.99", "billing_cycle": "monthly", "is_active": true})];
            if query.map_or(false, |q| q.contains("active_only=false")) {
                packages.push(json!({"id": 2, "name": "Legacy", "price": "4.00", "billing_cycle": "monthly", "is_active": false}));
            }
            reply(StatusCode::OK, json!(packages))
        }

        ("GET", ["api", "services", "subscriptions"]) => reply(
            StatusCode::OK,
            json!({"count": 3, "results": [
                {"id": 1, "status": "active", "created_at": "2024-01-10T09:00:00Z",
                 "department_details": {"name": "Ops"}, "service_package_details": {"name": "Basic"}},
                {"id": 2, "status": "active", "created_at": "2024-02-10T09:00:00Z"},
                {"id": 3, "status": "cancelled", "created_at": "2024-02-11T09:00:00Z"}
            ]}),
        ),
        ("PATCH", ["api", "services", "subscriptions", id]) => reply(
            StatusCode::OK,
            json!({"id": id.parse::<i64>().unwrap_or(0), "status": body["status"]}),
        ),
        ("POST", ["api", "services", "subscription-users", _]) => {
            reply(StatusCode::CREATED, json!({"id": 500, "user_id": body["user_id"]}))
        }

        ("GET", ["api", "users"]) => reply(
            StatusCode::OK,
            json!([
                {"user_id": 7, "email": EMAIL, "is_department_admin": true},
                {"user_id": 8, "email": "c@d.com"}
            ]),
        ),
        ("GET", ["api", "users", "search"]) => reply(
            StatusCode::OK,
            json!({"users": [{"user_id": 8, "email": "c@d.com"}], "total": 11}),
        ),

        _ => reply(StatusCode::NOT_FOUND, json!({"detail": "Not found."})),
    }
}

/// Log in as the seeded user and check the first token pair landed
pub async fn login(console: &Console) -> Result<()> {
    console.auth().login(EMAIL, PASSWORD).await?;
    anyhow::ensure!(console.auth().is_authenticated(), "login did not authenticate");
    Ok(())
}

pub fn bearer(token: &str) -> Option<String> {
    Some(format!("Bearer {}", token))
}

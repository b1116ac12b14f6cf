//! Refresh Coordinator: transparent refresh-and-retry around every API call.
//!
//! Per request: `Fresh` -> (401) refresh -> `Retried` -> done. A request is
//! retried at most once, so a token the backend keeps rejecting cannot loop.
//! Refreshes are single-flight: requests that fail together share one refresh
//! call. When no refresh is possible the session is cleared and a login
//! redirect is scheduled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, debug_span, error, info, warn, Instrument};
use uuid::Uuid;

use crate::error::{AuthError, ClientError, ClientResult};
use crate::navigation::{RedirectReason, RedirectScheduler};
use crate::session::claims::fingerprint;
use crate::session::CredentialStore;
use crate::transport::{ApiRequest, ApiResponse, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Fresh,
    Retried,
}

/// Per-request state; never shared between requests
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: Uuid,
    pub attempt: Attempt,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            attempt: Attempt::Fresh,
        }
    }

    /// Spend the single retry. Returns false if it was already spent.
    pub fn begin_retry(&mut self) -> bool {
        match self.attempt {
            Attempt::Fresh => {
                self.attempt = Attempt::Retried;
                true
            }
            Attempt::Retried => false,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access: Option<String>,
}

pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    redirects: Arc<RedirectScheduler>,
    refresh_path: String,
    refresh_guard: tokio::sync::Mutex<()>,
    refresh_calls: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<CredentialStore>,
        redirects: Arc<RedirectScheduler>,
        refresh_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            store,
            redirects,
            refresh_path: refresh_path.into(),
            refresh_guard: tokio::sync::Mutex::new(()),
            refresh_calls: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn redirects(&self) -> &Arc<RedirectScheduler> {
        &self.redirects
    }

    /// Number of refresh-endpoint calls issued so far
    pub fn refresh_count(&self) -> u64 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Send an authenticated request, refreshing and retrying once on 401
    pub async fn execute(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        let mut context = RequestContext::new();
        let span = debug_span!("api_request", id = %context.id, method = %request.method, path = %request.path);

        async move {
            let mut bearer = self.store.access_token();
            loop {
                match self.transport.send(request, bearer.as_deref()).await {
                    Err(err) if err.is_unauthorized() && context.begin_retry() => {
                        debug!("Access token rejected, attempting refresh");
                        bearer = Some(self.refresh_after_rejection(bearer.as_deref()).await?);
                    }
                    result => return result.map_err(ClientError::from),
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Send a request to a public endpoint: no bearer, no refresh
    pub async fn execute_public(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        Ok(self.transport.send(request, None).await?)
    }

    /// Refresh unconditionally (explicit user action)
    pub async fn force_refresh(&self) -> ClientResult<String> {
        let _singleflight = self.refresh_guard.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_after_rejection(&self, rejected: Option<&str>) -> ClientResult<String> {
        let _singleflight = self.refresh_guard.lock().await;

        // Another request refreshed while this one waited for the guard
        if let Some(current) = self.store.access_token() {
            if rejected != Some(current.as_str()) {
                debug!("Reusing access token {} from concurrent refresh", fingerprint(&current));
                return Ok(current);
            }
        }

        self.refresh_locked().await
    }

    // Caller holds the refresh guard
    async fn refresh_locked(&self) -> ClientResult<String> {
        let Some(refresh_token) = self.store.refresh_token() else {
            warn!("No refresh token available");
            self.invalidate_session();
            return Err(AuthError::SessionExpired.into());
        };

        match self.exchange(&refresh_token).await {
            Ok(access) => {
                self.store.replace_access_token(&access)?;
                info!("Token refresh successful");
                Ok(access)
            }
            Err(err) => {
                warn!("Token refresh failed: {}", err);
                self.invalidate_session();
                Err(AuthError::RefreshFailed(Box::new(err)).into())
            }
        }
    }

    async fn exchange(&self, refresh_token: &str) -> ClientResult<String> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        let request = ApiRequest::post(self.refresh_path.as_str()).with_body(json!({ "refresh": refresh_token }));
        let response = self.transport.send(&request, None).await?;

        let parsed: RefreshResponse = serde_json::from_value(response.body)
            .map_err(|e| AuthError::MalformedResponse(format!("token refresh response: {}", e)))?;

        parsed
            .access
            .filter(|access| !access.is_empty())
            .ok_or_else(|| AuthError::MalformedResponse("token refresh did not return an access token".to_string()).into())
    }

    fn invalidate_session(&self) {
        if let Err(e) = self.store.clear() {
            error!("Failed to clear session after refresh failure: {}", e);
        }
        self.redirects.schedule_login(Some(RedirectReason::SessionExpired));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{NavigationConfig, SessionConfig};
    use crate::error::TransportError;
    use crate::navigation::RecordingNavigator;
    use crate::session::{MemoryStorage, TokenPair};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory backend: accepts one bearer, refreshes to a configured token
    pub(crate) struct FakeBackend {
        pub valid_bearer: Mutex<String>,
        pub refresh_reply: Mutex<Result<Value, TransportError>>,
        pub refresh_delay: Duration,
        pub fail_every_call: bool,
        pub calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl FakeBackend {
        pub fn new(valid_bearer: &str, refreshed: &str) -> Self {
            Self {
                valid_bearer: Mutex::new(valid_bearer.to_string()),
                refresh_reply: Mutex::new(Ok(json!({ "access": refreshed }))),
                refresh_delay: Duration::ZERO,
                fail_every_call: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls_to(&self, path: &str) -> Vec<Option<String>> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(p, _)| p == path)
                .map(|(_, bearer)| bearer.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Transport for FakeBackend {
        async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push((request.path.clone(), bearer.map(str::to_string)));

            if request.path == "/token/refresh/" {
                if !self.refresh_delay.is_zero() {
                    tokio::time::sleep(self.refresh_delay).await;
                }
                let reply = self.refresh_reply.lock().unwrap().clone();
                return reply.map(|body| ApiResponse { status: 200, body });
            }

            if request.path == "/slow/" {
                return Err(TransportError::Timeout(Duration::from_secs(1)));
            }

            let valid = self.valid_bearer.lock().unwrap().clone();
            if !self.fail_every_call && bearer == Some(valid.as_str()) {
                Ok(ApiResponse { status: 200, body: json!({ "ok": true }) })
            } else {
                Err(TransportError::Http { status: 401, body: json!({ "detail": "Token is invalid or expired" }) })
            }
        }
    }

    pub(crate) struct Harness {
        pub backend: Arc<FakeBackend>,
        pub store: Arc<CredentialStore>,
        pub navigator: Arc<RecordingNavigator>,
        pub coordinator: Arc<RefreshCoordinator>,
    }

    pub(crate) fn harness(backend: FakeBackend) -> Harness {
        let backend = Arc::new(backend);
        let store = Arc::new(CredentialStore::new(Arc::new(MemoryStorage::new()), SessionConfig::default()));
        let navigator = Arc::new(RecordingNavigator::at("/Myurls"));
        let nav_config = NavigationConfig {
            redirect_delay_ms: 1,
            logout_redirect_delay_ms: 1,
            ..NavigationConfig::default()
        };
        let redirects = Arc::new(RedirectScheduler::new(navigator.clone(), nav_config));
        let coordinator = Arc::new(RefreshCoordinator::new(
            backend.clone(),
            store.clone(),
            redirects,
            "/token/refresh/",
        ));
        Harness { backend, store, navigator, coordinator }
    }

    #[test]
    fn test_request_context_allows_one_retry() {
        let mut context = RequestContext::new();
        assert_eq!(context.attempt, Attempt::Fresh);
        assert!(context.begin_retry());
        assert_eq!(context.attempt, Attempt::Retried);
        assert!(!context.begin_retry());
    }

    #[tokio::test]
    async fn test_refresh_then_retry_with_new_token() {
        let h = harness(FakeBackend::new("T2", "T2"));
        h.store.save(&TokenPair::new("T1", "R1")).unwrap();

        let response = h.coordinator.execute(&ApiRequest::get("/users/profile/")).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(h.coordinator.refresh_count(), 1);
        assert_eq!(
            h.backend.calls_to("/users/profile/"),
            vec![Some("T1".to_string()), Some("T2".to_string())]
        );
        assert_eq!(h.store.access_token().as_deref(), Some("T2"));
        assert_eq!(h.store.refresh_token().as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_missing_refresh_token_expires_session() {
        let h = harness(FakeBackend::new("T2", "T2"));

        let err = h.coordinator.execute(&ApiRequest::get("/users/profile/")).await.unwrap_err();

        assert!(matches!(err, ClientError::Auth(AuthError::SessionExpired)));
        assert_eq!(h.coordinator.refresh_count(), 0);
        assert!(h.backend.calls_to("/token/refresh/").is_empty());
        h.coordinator.redirects().flush().await;
        assert_eq!(h.navigator.visits(), vec!["/?login=true&error=session_expired".to_string()]);
    }

    #[tokio::test]
    async fn test_second_401_is_returned_without_another_refresh() {
        let mut backend = FakeBackend::new("T2", "T2");
        backend.fail_every_call = true;
        let h = harness(backend);
        h.store.save(&TokenPair::new("T1", "R1")).unwrap();

        let err = h.coordinator.execute(&ApiRequest::get("/api/users/")).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(h.coordinator.refresh_count(), 1);
        assert_eq!(h.backend.calls_to("/api/users/").len(), 2);
        // The refresh itself succeeded, so the session survives
        assert!(h.store.is_marked_authenticated());
    }

    #[tokio::test]
    async fn test_refresh_without_access_field_clears_session() {
        let backend = FakeBackend::new("T2", "T2");
        *backend.refresh_reply.lock().unwrap() = Ok(json!({ "detail": "ok" }));
        let h = harness(backend);
        h.store.save(&TokenPair::new("T1", "R1")).unwrap();

        let err = h.coordinator.execute(&ApiRequest::get("/users/profile/")).await.unwrap_err();

        match err {
            ClientError::Auth(AuthError::RefreshFailed(source)) => {
                assert!(matches!(*source, ClientError::Auth(AuthError::MalformedResponse(_))));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(h.store.access_token(), None);
        assert_eq!(h.store.refresh_token(), None);
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_session() {
        let backend = FakeBackend::new("T2", "T2");
        *backend.refresh_reply.lock().unwrap() = Err(TransportError::Http {
            status: 401,
            body: json!({ "detail": "Token is blacklisted" }),
        });
        let h = harness(backend);
        h.store.save(&TokenPair::new("T1", "R1")).unwrap();

        let err = h.coordinator.execute(&ApiRequest::get("/users/profile/")).await.unwrap_err();

        assert!(err.is_session_lost());
        assert!(!h.store.is_marked_authenticated());
        assert_eq!(h.coordinator.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_does_not_refresh() {
        let h = harness(FakeBackend::new("T1", "T2"));
        h.store.save(&TokenPair::new("T1", "R1")).unwrap();

        let err = h.coordinator.execute(&ApiRequest::get("/slow/")).await.unwrap_err();

        assert!(matches!(err, ClientError::Transport(TransportError::Timeout(_))));
        assert_eq!(h.coordinator.refresh_count(), 0);
        assert!(h.store.is_marked_authenticated());
    }

    #[tokio::test]
    async fn test_concurrent_rejections_share_one_refresh() {
        let mut backend = FakeBackend::new("T2", "T2");
        backend.refresh_delay = Duration::from_millis(20);
        let h = harness(backend);
        h.store.save(&TokenPair::new("T1", "R1")).unwrap();

        let requests: Vec<_> = (0..4)
            .map(|_| {
                let coordinator = h.coordinator.clone();
                tokio::spawn(async move { coordinator.execute(&ApiRequest::get("/api/departments/departments/")).await })
            })
            .collect();

        for request in requests {
            assert_eq!(request.await.unwrap().unwrap().status, 200);
        }
        assert_eq!(h.coordinator.refresh_count(), 1);
        assert!(h.navigator.visits().is_empty());
    }

    #[tokio::test]
    async fn test_public_requests_skip_refresh() {
        let h = harness(FakeBackend::new("T2", "T2"));
        h.store.save(&TokenPair::new("T1", "R1")).unwrap();

        let err = h.coordinator.execute_public(&ApiRequest::post("/users/auth/login/")).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(h.coordinator.refresh_count(), 0);
        assert_eq!(h.backend.calls_to("/users/auth/login/"), vec![None]);
    }
}

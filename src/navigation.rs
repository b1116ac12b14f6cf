//! Deferred navigation after session loss or logout.
//!
//! Redirects run as tasks on the event loop after a short delay so the
//! request chain that triggered them settles first. At most one login
//! redirect is pending at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::NavigationConfig;

/// Host-side navigation (a browser location, a terminal prompt, a test recorder)
pub trait Navigator: Send + Sync {
    fn current_route(&self) -> String;
    fn navigate(&self, target: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    SessionExpired,
}

impl RedirectReason {
    pub fn as_query_value(&self) -> &'static str {
        match self {
            RedirectReason::SessionExpired => "session_expired",
        }
    }
}

/// `<login_route>?login=true[&error=<reason>]`
pub fn login_redirect_target(login_route: &str, reason: Option<RedirectReason>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("login", "true");
    if let Some(reason) = reason {
        query.append_pair("error", reason.as_query_value());
    }
    format!("{}?{}", login_route, query.finish())
}

pub struct RedirectScheduler {
    navigator: Arc<dyn Navigator>,
    config: NavigationConfig,
    login_pending: Arc<AtomicBool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RedirectScheduler {
    pub fn new(navigator: Arc<dyn Navigator>, config: NavigationConfig) -> Self {
        Self {
            navigator,
            config,
            login_pending: Arc::new(AtomicBool::new(false)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn is_login_pending(&self) -> bool {
        self.login_pending.load(Ordering::SeqCst)
    }

    /// Send the user to the login entry point unless already on the landing route
    pub fn schedule_login(&self, reason: Option<RedirectReason>) {
        if self.login_pending.swap(true, Ordering::SeqCst) {
            debug!("Login redirect already pending");
            return;
        }

        let navigator = self.navigator.clone();
        let pending = self.login_pending.clone();
        let landing = self.config.landing_route.clone();
        let target = login_redirect_target(&self.config.login_route, reason);

        self.spawn_after(self.config.redirect_delay(), move || {
            let route = navigator.current_route();
            if route.contains(&landing) {
                debug!("Already on landing route '{}', skipping login redirect", route);
            } else {
                info!("Redirecting to login: {}", target);
                navigator.navigate(&target);
            }
            pending.store(false, Ordering::SeqCst);
        });
    }

    /// Post-logout navigation to the public landing route
    pub fn schedule_landing(&self) {
        let navigator = self.navigator.clone();
        let target = self.config.login_route.clone();

        self.spawn_after(self.config.logout_redirect_delay(), move || {
            navigator.navigate(&target);
        });
    }

    fn spawn_after<F>(&self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            // No event loop to defer onto: navigate now
            action();
            return;
        };

        let handle = runtime.spawn(async move {
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
            action();
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Wait for every scheduled navigation to run
    pub async fn flush(&self) {
        let handles: Vec<_> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            tasks.drain(..).collect()
        };

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Scheduled navigation failed: {}", e);
            }
        }
    }
}

/// Navigator that remembers where it was sent; useful for embedding and tests
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    route: Mutex<String>,
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(route: impl Into<String>) -> Self {
        Self {
            route: Mutex::new(route.into()),
            visits: Mutex::new(Vec::new()),
        }
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn current_route(&self) -> String {
        self.route.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn navigate(&self, target: &str) {
        if let Ok(mut route) = self.route.lock() {
            *route = target.to_string();
        }
        if let Ok(mut visits) = self.visits.lock() {
            visits.push(target.to_string());
        }
    }
}

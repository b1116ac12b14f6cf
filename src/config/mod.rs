use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub navigation: NavigationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub refresh_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub access_token_key: String,
    pub refresh_token_key: String,
    pub marker_name: String,
    pub marker_ttl_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    pub landing_route: String,
    pub login_route: String,
    pub redirect_delay_ms: u64,
    pub logout_redirect_delay_ms: u64,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl NavigationConfig {
    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    pub fn logout_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.logout_redirect_delay_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_token_key: "accessToken".to_string(),
            refresh_token_key: "refreshToken".to_string(),
            marker_name: "auth_session".to_string(),
            marker_ttl_days: 7,
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            landing_route: "/home-page".to_string(),
            login_route: "/".to_string(),
            redirect_delay_ms: 100,
            logout_redirect_delay_ms: 300,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    /// Development defaults pointed at an explicit backend, used by tests and embedders.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        let mut config = Self::development();
        config.api.base_url = base_url.into();
        config
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("CONSOLE_API_URL").or_else(|_| env::var("API_URL")) {
            if !v.trim().is_empty() {
                self.api.base_url = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("CONSOLE_REQUEST_TIMEOUT_SECS") {
            self.api.request_timeout_secs = v.parse().unwrap_or(self.api.request_timeout_secs);
        }
        if let Ok(v) = env::var("CONSOLE_REFRESH_PATH") {
            self.api.refresh_path = v;
        }

        // Session overrides
        if let Ok(v) = env::var("CONSOLE_SESSION_MARKER_TTL_DAYS") {
            self.session.marker_ttl_days = v.parse().unwrap_or(self.session.marker_ttl_days);
        }

        // Navigation overrides
        if let Ok(v) = env::var("CONSOLE_REDIRECT_DELAY_MS") {
            self.navigation.redirect_delay_ms = v.parse().unwrap_or(self.navigation.redirect_delay_ms);
        }
        if let Ok(v) = env::var("CONSOLE_LOGOUT_REDIRECT_DELAY_MS") {
            self.navigation.logout_redirect_delay_ms =
                v.parse().unwrap_or(self.navigation.logout_redirect_delay_ms);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: DEFAULT_API_URL.to_string(),
                request_timeout_secs: 30,
                refresh_path: "/token/refresh/".to_string(),
            },
            session: SessionConfig::default(),
            navigation: NavigationConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_url: DEFAULT_API_URL.to_string(),
                request_timeout_secs: 20,
                refresh_path: "/token/refresh/".to_string(),
            },
            session: SessionConfig::default(),
            navigation: NavigationConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: DEFAULT_API_URL.to_string(),
                request_timeout_secs: 15,
                refresh_path: "/token/refresh/".to_string(),
            },
            session: SessionConfig::default(),
            navigation: NavigationConfig::default(),
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<ClientConfig> = Lazy::new(ClientConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static ClientConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

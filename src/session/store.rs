//! Credential Store: the sole owner of session persistence.
//!
//! Holds the access/refresh token pair and an independent, dated session
//! marker. Every write is a single storage batch so readers never observe a
//! token without its marker (or the reverse).

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::StorageError;
use crate::session::claims::fingerprint;
use crate::session::storage::{StorageBackend, StorageOp};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self { access: access.into(), refresh: refresh.into() }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &fingerprint(&self.access))
            .field("refresh", &fingerprint(&self.refresh))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Some(SameSite::Strict),
            "lax" => Some(SameSite::Lax),
            "none" => Some(SameSite::None),
            _ => None,
        }
    }
}

/// Cookie-formatted corroboration marker, stored apart from the tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMarker {
    pub name: String,
    pub value: String,
    pub expires: DateTime<Utc>,
    pub path: String,
    pub same_site: Option<SameSite>,
}

impl SessionMarker {
    pub fn issue(name: &str, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            value: "true".to_string(),
            expires: now + ttl,
            path: "/".to_string(),
            same_site: Some(SameSite::Strict),
        }
    }

    /// Empty marker dated at the epoch, used to overwrite a live one
    pub fn expired(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: String::new(),
            expires: Utc.timestamp_opt(0, 0).single().unwrap_or_default(),
            path: "/".to_string(),
            same_site: None,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.value.is_empty() && self.expires > now
    }

    pub fn to_cookie_string(&self) -> String {
        let mut cookie = format!(
            "{}={}; expires={}; path={}",
            self.name,
            self.value,
            self.expires.to_rfc2822(),
            self.path
        );
        if let Some(same_site) = self.same_site {
            cookie.push_str("; SameSite=");
            cookie.push_str(same_site.as_str());
        }
        cookie
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';').map(str::trim);
        let (name, value) = parts.next()?.split_once('=')?;
        if name.is_empty() {
            return None;
        }

        let mut expires = None;
        let mut path = "/".to_string();
        let mut same_site = None;
        for attribute in parts {
            let (key, val) = attribute.split_once('=').unwrap_or((attribute, ""));
            match key.to_ascii_lowercase().as_str() {
                "expires" => {
                    expires = DateTime::parse_from_rfc2822(val).ok().map(|d| d.with_timezone(&Utc));
                }
                "path" => path = val.to_string(),
                "samesite" => same_site = SameSite::parse(val),
                _ => {}
            }
        }

        Some(Self {
            name: name.to_string(),
            value: value.to_string(),
            expires: expires?,
            path,
            same_site,
        })
    }
}

pub struct CredentialStore {
    backend: Arc<dyn StorageBackend>,
    config: SessionConfig,
    // Serializes multi-key reads against batched writes
    guard: Mutex<()>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn StorageBackend>, config: SessionConfig) -> Self {
        Self {
            backend,
            config,
            guard: Mutex::new(()),
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.read(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!("Failed to read '{}' from session storage: {}", key, e);
                None
            }
        }
    }

    fn read_marker(&self) -> Option<SessionMarker> {
        self.read(&self.config.marker_name)
            .and_then(|raw| SessionMarker::parse(&raw))
    }

    /// Persist both tokens and a fresh marker in one batch
    pub fn save(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        let marker = SessionMarker::issue(
            &self.config.marker_name,
            Duration::days(self.config.marker_ttl_days),
            Utc::now(),
        );
        let batch = [
            StorageOp::set(&self.config.access_token_key, &tokens.access),
            StorageOp::set(&self.config.refresh_token_key, &tokens.refresh),
            StorageOp::set(&self.config.marker_name, marker.to_cookie_string()),
        ];

        let _guard = self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.backend.apply(&batch)?;
        info!("Session saved (access {})", fingerprint(&tokens.access));
        Ok(())
    }

    /// Replace the access token after a refresh; the refresh token is unchanged
    pub fn replace_access_token(&self, access: &str) -> Result<(), StorageError> {
        let _guard = self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.backend
            .apply(&[StorageOp::set(&self.config.access_token_key, access)])?;
        debug!("Access token replaced ({})", fingerprint(access));
        Ok(())
    }

    /// Remove both tokens and overwrite the marker with an expired one. Idempotent.
    pub fn clear(&self) -> Result<(), StorageError> {
        let batch = [
            StorageOp::remove(&self.config.access_token_key),
            StorageOp::remove(&self.config.refresh_token_key),
            StorageOp::set(
                &self.config.marker_name,
                SessionMarker::expired(&self.config.marker_name).to_cookie_string(),
            ),
        ];

        let _guard = self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.backend.apply(&batch)?;
        info!("Session cleared");
        Ok(())
    }

    pub fn access_token(&self) -> Option<String> {
        let _guard = self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.read(&self.config.access_token_key)
    }

    pub fn refresh_token(&self) -> Option<String> {
        let _guard = self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.read(&self.config.refresh_token_key)
    }

    /// Token present AND an unexpired marker present
    pub fn is_marked_authenticated(&self) -> bool {
        let _guard = self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let has_token = self.read(&self.config.access_token_key).is_some();
        let marker_valid = self
            .read_marker()
            .map(|marker| marker.is_valid_at(Utc::now()))
            .unwrap_or(false);
        has_token && marker_valid
    }

    /// False when writes are dropped and no session can outlive the process
    pub fn is_persistent(&self) -> bool {
        self.backend.is_persistent()
    }

    pub fn marker(&self) -> Option<SessionMarker> {
        let _guard = self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.read_marker()
    }
}

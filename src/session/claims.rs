use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Claims we read from an access token for display purposes only
#[derive(Debug, Clone, Deserialize)]
pub struct AccessClaims {
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    pub user_id: Option<serde_json::Value>,
    pub token_type: Option<String>,
}

impl AccessClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }
}

/// Short, non-reversible tag for a token, safe to log
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    format!("sha256:{}", &hash[..12])
}

/// Read an access token's claims without verifying its signature.
///
/// The client never holds the signing key; the backend remains the only
/// authority on token validity. Returns `None` for opaque (non-JWT) tokens.
pub fn inspect_access_token(token: &str) -> Option<AccessClaims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims)
}

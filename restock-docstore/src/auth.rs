//! Service-account authentication for the Firestore REST API.
//!
//! A signed RS256 assertion is exchanged for a bearer token at the key's
//! `token_uri`. Tokens are cached until shortly before they expire.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::DocError;

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the reported expiry.
const REFRESH_MARGIN_SECS: i64 = 60;

/// The subset of a downloaded service-account key file we need.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub async fn from_file(path: &Path) -> Result<Self, DocError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DocError::Auth(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| DocError::Auth(format!("invalid service-account key {}: {e}", path.display())))
    }

    /// Build the signed assertion posted to the token endpoint.
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String, DocError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| DocError::Auth(format!("invalid private key: {e}")))?;
        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| DocError::Auth(format!("failed to sign assertion: {e}")))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
pub struct CachedToken {
    value: String,
    refresh_at: DateTime<Utc>,
}

/// Where bearer tokens come from.
#[derive(Debug)]
pub enum TokenSource {
    /// The local emulator accepts a fixed owner token.
    Emulator,
    ServiceAccount {
        key: ServiceAccountKey,
        cached: Mutex<Option<CachedToken>>,
    },
}

impl TokenSource {
    pub fn service_account(key: ServiceAccountKey) -> Self {
        TokenSource::ServiceAccount {
            key,
            cached: Mutex::new(None),
        }
    }

    /// A valid bearer token, fetching a new one if the cached one is stale.
    pub async fn token(&self, http: &reqwest::Client) -> Result<String, DocError> {
        let (key, cached) = match self {
            TokenSource::Emulator => return Ok("owner".to_string()),
            TokenSource::ServiceAccount { key, cached } => (key, cached),
        };

        let mut slot = cached.lock().await;
        let now = Utc::now();
        if let Some(token) = slot.as_ref().filter(|t| t.refresh_at > now) {
            return Ok(token.value.clone());
        }

        debug!(token_uri = %key.token_uri, "requesting access token");
        let assertion = key.assertion(now)?;
        let response = http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_server_error() {
                DocError::Transient(format!("token endpoint returned {status}: {body}"))
            } else {
                DocError::Auth(format!("token endpoint returned {status}: {body}"))
            });
        }
        let token: TokenResponse = response.json().await?;
        let refresh_in = (token.expires_in - REFRESH_MARGIN_SECS).max(0);
        *slot = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: now + Duration::seconds(refresh_in),
        });
        Ok(token.access_token)
    }
}

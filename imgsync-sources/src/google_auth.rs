//! Service-account OAuth for the Sheets API.
//!
//! A self-signed RS256 JWT is exchanged at the account's `token_uri` for a
//! short-lived bearer token (RFC 7523 jwt-bearer grant). Tokens are cached
//! until shortly before they expire.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use imgsync_core::error::io_err;
use imgsync_core::SourceError;

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Supplies bearer tokens for API calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, SourceError>;
}

/// A fixed token. Useful against emulators and in tests.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, SourceError> {
        Ok(self.0.clone())
    }
}

/// The fields of a service-account JSON key file this crate needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, SourceError> {
        let raw = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        serde_json::from_str(&raw).map_err(|e| {
            SourceError::Auth(format!("invalid service account file {}: {e}", path.display()))
        })
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// `base64url(header).base64url(claims)`, the part of a JWT that is signed.
pub fn signing_input(
    key: &ServiceAccountKey,
    scope: &str,
    issued_at: i64,
) -> Result<String, SourceError> {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let claims = Claims {
        iss: &key.client_email,
        scope,
        aud: &key.token_uri,
        iat: issued_at,
        exp: issued_at + TOKEN_LIFETIME_SECS,
    };
    let claims = serde_json::to_vec(&claims).map_err(|e| SourceError::Auth(e.to_string()))?;
    Ok(format!("{header}.{}", URL_SAFE_NO_PAD.encode(claims)))
}

/// Decode a PKCS#8 PEM block into DER bytes.
pub fn pem_to_der(pem: &str) -> Result<Vec<u8>, SourceError> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect();
    if body.is_empty() {
        return Err(SourceError::Auth("private key is empty".into()));
    }
    STANDARD
        .decode(body)
        .map_err(|e| SourceError::Auth(format!("private key is not valid base64: {e}")))
}

fn sign(key: &ServiceAccountKey, input: &str) -> Result<String, SourceError> {
    let der = pem_to_der(&key.private_key)?;
    let pair = RsaKeyPair::from_pkcs8(&der)
        .map_err(|e| SourceError::Auth(format!("private key rejected: {e}")))?;
    let mut signature = vec![0u8; pair.public().modulus_len()];
    pair.sign(&RSA_PKCS1_SHA256, &SystemRandom::new(), input.as_bytes(), &mut signature)
        .map_err(|_| SourceError::Auth("JWT signing failed".into()))?;
    Ok(URL_SAFE_NO_PAD.encode(signature))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    expires: Instant,
}

/// Exchanges signed assertions for access tokens and caches the result.
pub struct ServiceAccountTokens {
    key: ServiceAccountKey,
    scope: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Self {
        Self {
            key,
            scope: SPREADSHEETS_SCOPE.to_string(),
            http,
            cached: Mutex::new(None),
        }
    }

    async fn exchange(&self) -> Result<CachedToken, SourceError> {
        let input = signing_input(&self.key, &self.scope, chrono::Utc::now().timestamp())?;
        let assertion = format!("{input}.{}", sign(&self.key, &input)?);

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| SourceError::Auth(format!("token request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Auth(format!("token endpoint returned {status}: {body}")));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Auth(format!("malformed token response: {e}")))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS as u64));
        tracing::debug!(
            account = %self.key.client_email,
            lifetime_secs = lifetime.as_secs(),
            "access token issued"
        );
        Ok(CachedToken {
            value: token.access_token,
            expires: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        })
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokens {
    async fn token(&self) -> Result<String, SourceError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.expires > Instant::now()) {
            return Ok(token.value.clone());
        }
        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }
}

//! Google service-account authentication.
//!
//! A signed RS256 JWT assertion is exchanged at the key's `token_uri` for a
//! short-lived OAuth access token (the "JWT bearer" grant).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{Result, SyncError};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// The fields of a service-account key file that signing needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    config::TOKEN_URL.to_string()
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
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// A bearer token and the moment it stops being usable.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    expires_at: Instant,
}

impl AccessToken {
    pub fn new(value: String, lifetime: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + lifetime,
        }
    }

    pub fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

impl ServiceAccountKey {
    /// Resolve `path` (see [`resolve_credentials_path`]) and parse the key.
    pub fn load(path: &Path) -> Result<Self> {
        let resolved = resolve_credentials_path(path)?;
        tracing::info!("Using credentials file: {}", resolved.display());
        let contents = fs::read_to_string(&resolved).map_err(|e| {
            SyncError::SheetAuth(format!(
                "cannot read credentials file {}: {}",
                resolved.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| SyncError::SheetAuth(format!("malformed service-account key: {}", e)))
    }

    /// Build the signed assertion for the token request, issued at `now`
    /// (seconds since the epoch).
    pub fn signed_assertion(&self, scopes: &str, now: i64) -> Result<String> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| SyncError::SheetAuth(format!("invalid private key: {}", e)))?;
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: scopes,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| SyncError::SheetAuth(format!("failed to sign assertion: {}", e)))
    }

    /// Exchange a fresh assertion for an access token.
    pub fn request_token(&self, client: &Client) -> Result<AccessToken> {
        let assertion = self.signed_assertion(config::OAUTH_SCOPES, chrono::Utc::now().timestamp())?;
        tracing::info!("Authenticating as {}", self.client_email);

        let resp = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| {
                SyncError::SheetAuth(format!("token request to {} failed: {}", self.token_uri, e))
            })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(SyncError::SheetAuth(format!(
                "token request rejected (HTTP {}): {}",
                status, body
            )));
        }

        let token: TokenResponse = resp
            .json()
            .map_err(|e| SyncError::SheetAuth(format!("malformed token response: {}", e)))?;
        Ok(AccessToken::new(
            token.access_token,
            Duration::from_secs(token.expires_in),
        ))
    }
}

/// Find the credentials file: `path` itself, or else a file with the same
/// name in the current directory.
pub fn resolve_credentials_path(path: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    resolve_credentials_path_in(path, &cwd)
}

/// [`resolve_credentials_path`] with an explicit fallback directory.
pub fn resolve_credentials_path_in(path: &Path, fallback_dir: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    tracing::warn!("Credentials file not found at: {}", path.display());

    if let Some(name) = path.file_name() {
        let candidate = fallback_dir.join(name);
        if candidate.is_file() {
            tracing::info!("Found credentials file in {}", fallback_dir.display());
            return Ok(candidate);
        }
    }

    Err(SyncError::SheetAuth(format!(
        "credentials file not found at {} or in {}",
        path.display(),
        fallback_dir.display()
    )))
}

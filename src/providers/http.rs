//! HTTP session backend: resolve, refresh, and revoke over REST.
//!
//! Endpoints (relative to the configured base URL):
//! - `GET /api/auth/me` returns the current `User`
//! - `POST /api/auth/refresh` returns a `RefreshedCredential`
//! - `POST /api/auth/logout` revokes the credential
//!
//! The credential travels as a Bearer token.

use std::time::Duration;

use reqwest::StatusCode;

use super::{CredentialRefresher, CredentialRevoker, UserResolver};
use crate::error::SessionError;
use crate::types::{Credential, RefreshedCredential, User};

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Connection settings for [`HttpSessionBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBackendConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl HttpBackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS) }
    }
}

/// REST implementation of the resolver, refresher, and revoker roles.
#[derive(Debug, Clone)]
pub struct HttpSessionBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionBackend {
    /// Build a backend with its own `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &HttpBackendConfig) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, base_url: normalize_base_url(&config.base_url) })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl UserResolver for HttpSessionBackend {
    async fn resolve_user(&self, credential: &Credential) -> Result<User, SessionError> {
        let resp = self
            .client
            .get(me_endpoint(&self.base_url))
            .bearer_auth(credential.expose())
            .send()
            .await
            .map_err(|e| SessionError::Resolve(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SessionError::Resolve(status_message("resolve", status)));
        }

        resp.json::<User>()
            .await
            .map_err(|e| SessionError::Resolve(e.to_string()))
    }
}

#[async_trait::async_trait]
impl CredentialRefresher for HttpSessionBackend {
    async fn refresh_credential(&self, credential: &Credential) -> Result<RefreshedCredential, SessionError> {
        let resp = self
            .client
            .post(refresh_endpoint(&self.base_url))
            .bearer_auth(credential.expose())
            .send()
            .await
            .map_err(|e| SessionError::Refresh(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SessionError::Refresh(status_message("refresh", status)));
        }

        resp.json::<RefreshedCredential>()
            .await
            .map_err(|e| SessionError::Refresh(e.to_string()))
    }
}

#[async_trait::async_trait]
impl CredentialRevoker for HttpSessionBackend {
    async fn revoke_credential(&self, credential: &Credential) -> Result<(), SessionError> {
        let resp = self
            .client
            .post(logout_endpoint(&self.base_url))
            .bearer_auth(credential.expose())
            .send()
            .await
            .map_err(|e| SessionError::Revoke(e.to_string()))?;

        let status = resp.status();
        // Already-gone sessions count as revoked.
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(SessionError::Revoke(status_message("revoke", status)))
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}

fn me_endpoint(base_url: &str) -> String {
    format!("{base_url}/api/auth/me")
}

fn refresh_endpoint(base_url: &str) -> String {
    format!("{base_url}/api/auth/refresh")
}

fn logout_endpoint(base_url: &str) -> String {
    format!("{base_url}/api/auth/logout")
}

fn status_message(stage: &str, status: StatusCode) -> String {
    format!("{stage} request failed: {}", status.as_u16())
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

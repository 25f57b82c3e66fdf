// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! OAuth2 service for the Google authorization code flow.
//!
//! Handles:
//! - Building the consent URL (offline access, forced consent, CSRF state)
//! - Exchanging authorization codes for tokens
//! - Refreshing access tokens

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine as _};
use log::{debug, error, info};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use super::oauth_config::{GoogleOAuthConfig, GMAIL_READONLY_SCOPE};

/// Errors from OAuth2 operations.
#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("Google OAuth is not configured")]
    NotConfigured,
    #[error("Invalid state parameter (possible CSRF)")]
    InvalidState,
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Token response from Google's token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// The token pair the browser holds between requests. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Tokens issued for a freshly granted authorization code.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Unix timestamp (seconds) when the access token expires.
    pub expires_at: i64,
}

/// Access tokens Google issues live for an hour unless told otherwise.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// The identity provider seam: consent URL, code exchange and refresh.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError>;

    async fn exchange_code(&self, code: &str) -> Result<TokenPair, OAuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, OAuthError>;
}

pub struct GoogleOAuthService {
    config: GoogleOAuthConfig,
    http_client: reqwest::Client,
}

impl GoogleOAuthService {
    pub fn new(config: GoogleOAuthConfig, http_client: reqwest::Client) -> Self {
        Self { config, http_client }
    }

    fn configured(&self) -> Result<&GoogleOAuthConfig, OAuthError> {
        if self.config.is_configured() {
            Ok(&self.config)
        } else {
            Err(OAuthError::NotConfigured)
        }
    }

    async fn post_token_form(&self, params: &[(&str, &str)]) -> Result<reqwest::Response, OAuthError> {
        let config = self.configured()?;
        Ok(self.http_client.post(&config.token_url).form(params).send().await?)
    }
}

#[async_trait]
impl IdentityProvider for GoogleOAuthService {
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        let config = self.configured()?;
        let auth_url = format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&access_type=offline&prompt=consent&state={}",
            config.auth_url,
            urlencoding::encode(&config.client_id),
            urlencoding::encode(&config.redirect_uri),
            urlencoding::encode(GMAIL_READONLY_SCOPE),
            urlencoding::encode(state),
        );
        debug!("Generated Google OAuth2 authorization URL");
        Ok(auth_url)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenPair, OAuthError> {
        let config = self.configured()?;
        let params = [
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        info!("Exchanging authorization code for tokens");
        let response = self.post_token_form(&params).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Token exchange failed: HTTP {} - {}", status, body);
            return Err(OAuthError::TokenExchangeFailed(format!("HTTP {}: {}", status, body)));
        }

        let token_response: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(format!("JSON parse: {}", e)))?;

        let refresh_token = token_response
            .refresh_token
            .ok_or_else(|| OAuthError::TokenExchangeFailed("no refresh token issued".to_string()))?;

        info!("Successfully exchanged authorization code for tokens");
        Ok(TokenPair {
            access_token: token_response.access_token,
            refresh_token,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, OAuthError> {
        let config = self.configured()?;
        let params = [
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        debug!("Refreshing Google OAuth2 access token");
        let response = self.post_token_form(&params).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Token refresh failed: HTTP {} - {}", status, body);
            return Err(OAuthError::TokenRefreshFailed(format!("HTTP {}: {}", status, body)));
        }

        let token_response: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::TokenRefreshFailed(format!("JSON parse: {}", e)))?;

        let lifetime = token_response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        debug!("Successfully refreshed Google OAuth2 access token");
        Ok(RefreshedToken {
            access_token: token_response.access_token,
            expires_at: chrono::Utc::now().timestamp() + lifetime,
        })
    }
}

/// Random URL-safe string over `len` bytes of entropy, used for the OAuth `state`.
pub fn generate_random_string(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE64URL.encode(&bytes)
}

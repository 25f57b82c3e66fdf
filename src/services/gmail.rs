// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mail store access: the `MailStore` trait and its Gmail REST implementation.

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::mail::types::GmailMessage;

pub const DEFAULT_GMAIL_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

#[derive(Debug, Error)]
pub enum MailStoreError {
    #[error("Insufficient mailbox permissions: {0}")]
    InsufficientScope(String),

    #[error("Mail store rejected the access token: {0}")]
    Unauthorized(String),

    #[error("Mail store API error: {0}")]
    Api(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl MailStoreError {
    /// Errors that make every further call for this user pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MailStoreError::InsufficientScope(_) | MailStoreError::Unauthorized(_))
    }
}

/// Keyword search and message retrieval over one user's mailbox.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MailStore: Send + Sync {
    /// Returns matching message ids in the store's ranking order.
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<String>, MailStoreError>;

    async fn get_message(&self, id: &str) -> Result<GmailMessage, MailStoreError>;
}

/// Builds a mail store bound to a user's (freshly refreshed) access token.
pub trait MailStoreFactory: Send + Sync {
    fn for_access_token(&self, access_token: &str) -> Arc<dyn MailStore>;
}

#[derive(Deserialize)]
struct ListMessagesResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Clone)]
pub struct GmailClient {
    http_client: Client,
    access_token: String,
    base_url: String,
}

impl GmailClient {
    pub fn new(http_client: Client, access_token: String) -> Self {
        Self {
            http_client,
            access_token,
            base_url: DEFAULT_GMAIL_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, MailStoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_else(|_| "<failed to read error body>".to_string());
        error!("Gmail API request failed with status {}: {}", status, body);
        Err(classify_failure(status, body))
    }
}

/// Maps a non-success Gmail response onto the error taxonomy.
pub fn classify_failure(status: StatusCode, body: String) -> MailStoreError {
    let lowered = body.to_lowercase();
    match status {
        StatusCode::FORBIDDEN
            if lowered.contains("insufficient") || lowered.contains("scope") || lowered.contains("permission") =>
        {
            MailStoreError::InsufficientScope(body)
        }
        StatusCode::UNAUTHORIZED => MailStoreError::Unauthorized(body),
        _ => MailStoreError::Api(format!("HTTP {}: {}", status, body)),
    }
}

#[async_trait]
impl MailStore for GmailClient {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<String>, MailStoreError> {
        debug!("Gmail search q={:?} maxResults={}", query, max_results);
        let url = format!("{}/messages", self.base_url);
        let max_results = max_results.to_string();

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("q", query), ("maxResults", max_results.as_str())])
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await?;

        let listing: ListMessagesResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| MailStoreError::Api(format!("Failed to deserialize message list: {}", e)))?;

        Ok(listing.messages.into_iter().map(|m| m.id).collect())
    }

    async fn get_message(&self, id: &str) -> Result<GmailMessage, MailStoreError> {
        let url = format!("{}/messages/{}", self.base_url, urlencoding::encode(id));

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("format", "full")])
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await?;

        Self::check_status(response)
            .await?
            .json::<GmailMessage>()
            .await
            .map_err(|e| MailStoreError::Api(format!("Failed to deserialize message {}: {}", id, e)))
    }
}

/// Produces a `GmailClient` per request, sharing one connection pool.
pub struct GmailClientFactory {
    http_client: Client,
    base_url: String,
}

impl GmailClientFactory {
    pub fn new(http_client: Client) -> Self {
        Self {
            http_client,
            base_url: DEFAULT_GMAIL_BASE_URL.to_string(),
        }
    }
}

impl MailStoreFactory for GmailClientFactory {
    fn for_access_token(&self, access_token: &str) -> Arc<dyn MailStore> {
        Arc::new(
            GmailClient::new(self.http_client.clone(), access_token.to_string())
                .with_base_url(self.base_url.clone()),
        )
    }
}

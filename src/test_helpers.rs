// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// Test helpers module
/// Scripted stand-ins for the reasoning service, mailbox and identity provider
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

use crate::config::{
    AgentConfig, GeminiConfig, GoogleConfig, LogConfig, QueryStrategy, RetryConfig, ServerConfig, Settings,
};
use crate::mail::types::{GmailMessage, MessageHeader, MessagePart, MessagePartBody};
use crate::services::ai::{AiProvider, ProviderError};
use crate::services::gmail::{MailStore, MailStoreError, MailStoreFactory};
use crate::services::oauth_service::{IdentityProvider, OAuthError, RefreshedToken, TokenPair};

static INIT: Once = Once::new();

/// Route `log` output through the test harness once per process.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Settings for tests: no retry delay, insecure cookies, dummy credentials.
pub fn test_settings() -> Settings {
    Settings {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            public_url: "http://localhost:3000".to_string(),
            secure_cookies: false,
        },
        google: GoogleConfig {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
        },
        gemini: GeminiConfig {
            api_key: "test-key".to_string(),
            model: "gemini-2.0-flash".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            temperature: 0.0,
        },
        agent: AgentConfig {
            max_iterations: 5,
            strategy: QueryStrategy::Agent,
        },
        retry: RetryConfig {
            max_attempts: 3,
            base_delay_ms: 0,
            max_delay_ms: 0,
            max_jitter_ms: 0,
        },
        log: LogConfig { level: "debug".to_string() },
    }
}

/// Replays canned completions in order and records every prompt it was sent.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Ok(text.to_string()))
    }

    pub fn overloaded(self, times: usize) -> Self {
        (0..times).fold(self, |p, _| p.push(Err(ProviderError::Overloaded("503 UNAVAILABLE".to_string()))))
    }

    pub fn timed_out(self, times: usize) -> Self {
        (0..times).fold(self, |p, _| p.push(Err(ProviderError::Timeout("operation timed out".to_string()))))
    }

    pub fn fail(self, error: ProviderError) -> Self {
        self.push(Err(error))
    }

    fn push(self, reply: Result<String, ProviderError>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.prompts().len()
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    async fn complete(&self, prompt: &str, _system_instructions: &str) -> Result<String, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(|| Err(ProviderError::Request("no scripted reply left".to_string())))
    }
}

/// Builds a Gmail API message with a single text/plain body.
pub fn gmail_message(id: &str, from: &str, subject: &str, date: &str, body: &str) -> GmailMessage {
    let header = |name: &str, value: &str| MessageHeader {
        name: name.to_string(),
        value: value.to_string(),
    };
    GmailMessage {
        id: id.to_string(),
        thread_id: Some(format!("t-{}", id)),
        snippet: Some(body.chars().take(80).collect()),
        payload: Some(MessagePart {
            mime_type: Some("text/plain".to_string()),
            headers: vec![header("From", from), header("Subject", subject), header("Date", date)],
            body: Some(MessagePartBody {
                data: Some(URL_SAFE.encode(body)),
                size: Some(body.len() as u64),
            }),
            parts: Vec::new(),
        }),
    }
}

/// A mailbox held in memory. Search understands quoted phrases, `OR` and
/// `from:`; anything else is a case-insensitive substring match.
#[derive(Default)]
pub struct InMemoryMailStore {
    messages: Vec<GmailMessage>,
    searches: Mutex<Vec<String>>,
    deny_scope: bool,
}

impl InMemoryMailStore {
    pub fn new(messages: Vec<GmailMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Every call fails as if the token lacked mailbox read permission.
    pub fn without_read_scope() -> Self {
        Self {
            deny_scope: true,
            ..Default::default()
        }
    }

    /// Queries sent to the store, in order, including fallback tiers.
    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn searchable_text(message: &GmailMessage) -> String {
        let headers = message
            .payload
            .as_ref()
            .map(|p| p.headers.iter().map(|h| h.value.as_str()).collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        format!("{} {}", headers, message.snippet.as_deref().unwrap_or("")).to_lowercase()
    }

    fn sender(message: &GmailMessage) -> String {
        message
            .payload
            .as_ref()
            .and_then(|p| p.headers.iter().find(|h| h.name.eq_ignore_ascii_case("from")))
            .map(|h| h.value.to_lowercase())
            .unwrap_or_default()
    }

    fn term_matches(message: &GmailMessage, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if let Some(sender) = term.strip_prefix("from:") {
            return Self::sender(message).contains(sender);
        }
        let phrase = term.trim_matches('"');
        !phrase.is_empty() && Self::searchable_text(message).contains(phrase)
    }

    fn matches(message: &GmailMessage, query: &str) -> bool {
        if query.contains(" OR ") {
            return query.split(" OR ").any(|t| Self::term_matches(message, t));
        }
        if query.starts_with('"') {
            return Self::term_matches(message, query);
        }
        query.split_whitespace().all(|t| Self::term_matches(message, t))
    }
}

#[async_trait]
impl MailStore for InMemoryMailStore {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<String>, MailStoreError> {
        if let Ok(mut searches) = self.searches.lock() {
            searches.push(query.to_string());
        }
        if self.deny_scope {
            return Err(MailStoreError::InsufficientScope(
                "Request had insufficient authentication scopes.".to_string(),
            ));
        }
        Ok(self
            .messages
            .iter()
            .filter(|m| Self::matches(m, query))
            .take(max_results as usize)
            .map(|m| m.id.clone())
            .collect())
    }

    async fn get_message(&self, id: &str) -> Result<GmailMessage, MailStoreError> {
        if self.deny_scope {
            return Err(MailStoreError::InsufficientScope("insufficient scope".to_string()));
        }
        self.messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| MailStoreError::Api(format!("message {} not found", id)))
    }
}

/// Hands out the same store for every token and remembers the tokens used.
pub struct SharedStoreFactory {
    store: Arc<InMemoryMailStore>,
    tokens: Mutex<Vec<String>>,
}

impl SharedStoreFactory {
    pub fn new(store: Arc<InMemoryMailStore>) -> Self {
        Self {
            store,
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl MailStoreFactory for SharedStoreFactory {
    fn for_access_token(&self, access_token: &str) -> Arc<dyn MailStore> {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.push(access_token.to_string());
        }
        self.store.clone()
    }
}

pub const REVOKED_REFRESH_TOKEN: &str = "revoked";

/// Identity provider that accepts any refresh token except [`REVOKED_REFRESH_TOKEN`].
pub struct StaticIdentityProvider {
    pub access_token: String,
}

impl Default for StaticIdentityProvider {
    fn default() -> Self {
        Self {
            access_token: "fresh-access-token".to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        Ok(format!("https://accounts.google.com/o/oauth2/v2/auth?state={}", state))
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenPair, OAuthError> {
        if code.is_empty() {
            return Err(OAuthError::TokenExchangeFailed("empty code".to_string()));
        }
        Ok(TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: format!("refresh-for-{}", code),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, OAuthError> {
        if refresh_token == REVOKED_REFRESH_TOKEN {
            return Err(OAuthError::TokenRefreshFailed("HTTP 400: invalid_grant".to_string()));
        }
        Ok(RefreshedToken {
            access_token: self.access_token.clone(),
            expires_at: chrono::Utc::now().timestamp() + 3600,
        })
    }
}

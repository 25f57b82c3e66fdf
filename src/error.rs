// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::services::gmail::MailStoreError;

/// Everything that can stop a question from being answered.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Insufficient mailbox permissions: {0}")]
    UpstreamScope(String),

    #[error("Mail store error: {0}")]
    MailStore(String),

    /// A non-retryable reasoning service failure.
    #[error("Reasoning service error: {0}")]
    ReasoningService(String),

    #[error("Malformed reasoning output: {0}")]
    MalformedOutput(String),

    /// A well-formed decision the loop cannot act on.
    #[error("Agent protocol error: {0}")]
    Protocol(String),

    #[error("No relevant emails found after {iterations} iteration(s)")]
    NothingFound { iterations: usize },
}

impl AgentError {
    /// Text suitable for the `answer` field of an error response.
    pub fn user_message(&self) -> &'static str {
        match self {
            AgentError::Authentication(_) => {
                "Your Google session has expired or is missing. Please sign in with Google again."
            }
            AgentError::UpstreamScope(_) => {
                "This app doesn't have permission to read your Gmail. Please sign out and sign in again, granting read access to your email."
            }
            AgentError::NothingFound { .. } => {
                "I couldn't find any emails relevant to your question. Try rephrasing it or mentioning a sender or subject."
            }
            AgentError::MailStore(_)
            | AgentError::ReasoningService(_)
            | AgentError::MalformedOutput(_)
            | AgentError::Protocol(_) => "Sorry, something went wrong while processing your question. Please try again.",
        }
    }
}

impl From<MailStoreError> for AgentError {
    fn from(err: MailStoreError) -> Self {
        match err {
            MailStoreError::InsufficientScope(msg) => AgentError::UpstreamScope(msg),
            MailStoreError::Unauthorized(msg) => AgentError::Authentication(msg),
            other => AgentError::MailStore(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mail_store_errors_map_by_kind() {
        assert!(matches!(
            AgentError::from(MailStoreError::InsufficientScope("gmail.readonly".into())),
            AgentError::UpstreamScope(_)
        ));
        assert!(matches!(
            AgentError::from(MailStoreError::Unauthorized("expired".into())),
            AgentError::Authentication(_)
        ));
        assert!(matches!(
            AgentError::from(MailStoreError::Api("HTTP 500".into())),
            AgentError::MailStore(_)
        ));
    }

    #[test]
    fn test_user_messages_mention_next_step() {
        assert!(AgentError::UpstreamScope(String::new()).user_message().contains("permission"));
        assert!(AgentError::Authentication(String::new()).user_message().contains("sign in"));
    }
}

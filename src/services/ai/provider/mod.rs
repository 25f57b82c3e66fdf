// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use thiserror::Error;

pub mod gemini;

pub use gemini::GeminiAdapter;

/// Failures from a text-completion provider.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    /// Rate limited or temporarily overloaded; worth retrying after a delay.
    #[error("Reasoning service overloaded: {0}")]
    Overloaded(String),

    /// Timed out or could not connect; retried like an overload.
    #[error("Reasoning service unreachable: {0}")]
    Timeout(String),

    #[error("Reasoning service request failed: {0}")]
    Request(String),

    #[error("Reasoning service returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Overloaded(_) | ProviderError::Timeout(_))
    }
}

/// Trait defining the interface for a text-completion provider.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Completes `prompt` under the given system instructions and returns the raw text.
    async fn complete(&self, prompt: &str, system_instructions: &str) -> Result<String, ProviderError>;
}

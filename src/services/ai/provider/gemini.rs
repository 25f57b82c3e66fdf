// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// src/services/ai/provider/gemini.rs
// Google Gemini uses a different API structure than OpenAI

use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{AiProvider, ProviderError};
use crate::config::GeminiConfig;

// --- Gemini Specific Request/Response Structs ---
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Deserialize)]
struct GeminiGenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Clone)]
pub struct GeminiAdapter {
    api_key: String,
    http_client: Client,
    model: String,
    base_url: String,
    temperature: f32,
}

impl GeminiAdapter {
    pub fn new(config: &GeminiConfig, http_client: Client) -> Self {
        Self {
            api_key: config.api_key.clone(),
            http_client,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
        }
    }
}

/// Decides whether a failed generateContent call is worth retrying.
fn classify_failure(status: StatusCode, body: &str) -> ProviderError {
    let overloaded = status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::SERVICE_UNAVAILABLE
        || body.contains("RESOURCE_EXHAUSTED")
        || body.contains("UNAVAILABLE");
    let message = format!("Gemini API returned error status {}: {}", status, body);
    if overloaded {
        ProviderError::Overloaded(message)
    } else {
        ProviderError::Request(message)
    }
}

fn classify_send_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() {
        warn!("Gemini API unreachable: {}", err);
        ProviderError::Timeout(format!("Gemini: {}", err))
    } else {
        ProviderError::Request(format!("Gemini: {}", err))
    }
}

#[async_trait]
impl AiProvider for GeminiAdapter {
    async fn complete(&self, prompt: &str, system_instructions: &str) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent?key={}", self.base_url, self.model, self.api_key);

        let request_payload = GeminiGenerateRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: prompt.to_string() }],
            }],
            system_instruction: (!system_instructions.is_empty()).then(|| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: system_instructions.to_string() }],
            }),
            generation_config: Some(GeminiGenerationConfig {
                temperature: self.temperature,
                max_output_tokens: 2000,
            }),
        };

        debug!("Sending request to Gemini API: model={}, prompt_chars={}", self.model, prompt.len());

        let response = self
            .http_client
            .post(&url)
            .json(&request_payload)
            .timeout(std::time::Duration::from_secs(60))
            .send()
            .await
            .map_err(classify_send_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_else(|_| "<failed to read error body>".to_string());
            error!("Gemini API request failed with status {}: {}", status, error_body);
            return Err(classify_failure(status, &error_body));
        }

        let response_body = response
            .json::<GeminiGenerateResponse>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to deserialize Gemini response: {}", e)))?;

        // Extract the first candidate's text parts
        let text: String = response_body
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            warn!("Gemini API response did not contain any candidates or parts.");
            return Err(ProviderError::InvalidResponse(
                "Gemini response was empty or missing candidates".to_string(),
            ));
        }

        debug!("Received response from Gemini API.");
        Ok(text)
    }
}

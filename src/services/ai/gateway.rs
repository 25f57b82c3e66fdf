// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Every reasoning call goes through here: bounded retry with exponential
//! backoff when the provider is overloaded, plus the agent's decision step.

use log::{debug, info, warn};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::plan::{answer_hint, parse_plan, AgentPlan};
use super::prompts::{duplicate_query_instruction, DECISION_SYSTEM, FORCE_FINAL_INSTRUCTION};
use super::provider::{AiProvider, ProviderError};
use crate::agent::session::TriedQueries;
use crate::config::RetryConfig;
use crate::error::AgentError;

pub const OVERLOADED_ANSWER: &str =
    "I'm sorry, the AI service is overloaded right now and I couldn't finish answering your question. Please try again in a minute.";

pub const GENERIC_FINAL_ANSWER: &str = "I couldn't find enough information in your emails to answer that question.";

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
            max_jitter: config.max_jitter(),
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget, no waiting.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Wait before retry number `retry` (1-based): base * 2^(retry-1), capped, plus jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        let backoff = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return backoff;
        }
        backoff + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Reasoning service still overloaded after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: ProviderError },

    #[error(transparent)]
    Provider(ProviderError),
}

pub struct ReasoningGateway {
    provider: Arc<dyn AiProvider>,
    retry: RetryPolicy,
}

impl ReasoningGateway {
    pub fn new(provider: Arc<dyn AiProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    /// One completion, retried while the provider reports overload.
    pub async fn complete(&self, prompt: &str, system_instructions: &str) -> Result<String, GatewayError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.provider.complete(prompt, system_instructions).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "Reasoning service overloaded (attempt {}/{}), retrying in {:?}: {}",
                        attempt, self.retry.max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    warn!("Reasoning service overloaded, giving up after {} attempt(s)", attempt);
                    return Err(GatewayError::Exhausted { attempts: attempt, last: e });
                }
                Err(e) => return Err(GatewayError::Provider(e)),
            }
        }
    }

    /// Asks for the agent's next step.
    ///
    /// With `force_final` any non-final decision is turned into a final one.
    /// A search that repeats a tried query is sent back once for a different one.
    /// Exhausted retries become a final apology rather than an error.
    pub async fn decide(&self, context: &str, force_final: bool, tried: &TriedQueries) -> Result<AgentPlan, AgentError> {
        let prompt = if force_final {
            format!("{}\n\n{}", context, FORCE_FINAL_INSTRUCTION)
        } else {
            context.to_string()
        };

        let (plan, raw) = match self.request_plan(&prompt).await? {
            Some(decision) => decision,
            None => return Ok(overloaded_final()),
        };

        if force_final {
            if plan.is_final() {
                return Ok(plan);
            }
            info!("Forcing final answer in place of '{}'", plan.tag());
            let answer = answer_hint(&raw).unwrap_or_else(|| GENERIC_FINAL_ANSWER.to_string());
            return Ok(AgentPlan::Final { answer: Some(answer) });
        }

        let duplicate = match plan.search_query() {
            Some(query) if tried.contains(query) => query.to_string(),
            _ => return Ok(plan),
        };

        info!("Decision repeats tried query {:?}, asking for another", duplicate);
        let retry_prompt = format!("{}\n\n{}", prompt, duplicate_query_instruction(&duplicate));
        match self.request_plan(&retry_prompt).await? {
            Some((plan, _)) => Ok(plan),
            None => Ok(overloaded_final()),
        }
    }

    /// `None` when the provider stayed overloaded through every attempt.
    async fn request_plan(&self, prompt: &str) -> Result<Option<(AgentPlan, serde_json::Value)>, AgentError> {
        let text = match self.complete(prompt, DECISION_SYSTEM).await {
            Ok(text) => text,
            Err(GatewayError::Exhausted { .. }) => return Ok(None),
            Err(GatewayError::Provider(e)) => return Err(AgentError::ReasoningService(e.to_string())),
        };
        debug!("Raw decision: {}", text);

        let (plan, raw) = parse_plan(&text).map_err(|e| {
            warn!("Unusable decision from reasoning service: {}", e);
            AgentError::MalformedOutput(e.to_string())
        })?;
        Ok(Some((plan, raw)))
    }
}

fn overloaded_final() -> AgentPlan {
    AgentPlan::Final { answer: Some(OVERLOADED_ANSWER.to_string()) }
}

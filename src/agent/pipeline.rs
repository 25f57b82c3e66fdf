// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! One-pass strategy: derive search parameters, search once, extract from
//! each email concurrently, optionally sum, then write the answer.
//!
//! Every reasoning call here has a local fallback, so only mailbox failures
//! surface as errors.

use futures::future::join_all;
use log::{debug, info, warn};
use serde::Deserialize;
use std::sync::Arc;

use super::AgentAnswer;
use crate::error::AgentError;
use crate::mail::aggregate::sum_amounts;
use crate::mail::search::SearchExecutor;
use crate::mail::types::MessageSummary;
use crate::services::ai::plan::extract_json;
use crate::services::ai::prompts::{
    extraction_prompt, final_answer_prompt, search_params_prompt, DEFAULT_EXTRACTION_INSTRUCTIONS,
    EXTRACTION_SYSTEM, FINAL_ANSWER_SYSTEM, SEARCH_PARAMS_SYSTEM,
};
use crate::services::ai::ReasoningGateway;

pub const NO_EMAILS_ANSWER: &str =
    "I couldn't find any emails matching your question. Try rephrasing it or mentioning a sender or subject.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    #[default]
    #[serde(other)]
    None,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub search_query: String,
    #[serde(default)]
    pub extraction_instructions: Option<String>,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub category: Option<String>,
}

impl SearchParams {
    /// Used whenever the reasoning service can't produce parameters.
    pub fn fallback(question: &str) -> Self {
        Self {
            search_query: question.trim().to_string(),
            extraction_instructions: None,
            aggregation: Aggregation::None,
            category: None,
        }
    }

    pub fn instructions(&self) -> &str {
        self.extraction_instructions
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_EXTRACTION_INSTRUCTIONS)
    }
}

pub struct QueryPipeline {
    gateway: Arc<ReasoningGateway>,
    search: SearchExecutor,
}

impl QueryPipeline {
    pub fn new(gateway: Arc<ReasoningGateway>, search: SearchExecutor) -> Self {
        Self { gateway, search }
    }

    pub async fn generate_search_params(&self, question: &str) -> SearchParams {
        let text = match self.gateway.complete(&search_params_prompt(question), SEARCH_PARAMS_SYSTEM).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Search parameter generation failed, searching for the question itself: {}", e);
                return SearchParams::fallback(question);
            }
        };

        match extract_json(&text).map(serde_json::from_value::<SearchParams>) {
            Some(Ok(params)) if !params.search_query.trim().is_empty() => {
                debug!("Search parameters: {:?}", params);
                params
            }
            Some(Err(e)) => {
                warn!("Unusable search parameters ({}), searching for the question itself", e);
                SearchParams::fallback(question)
            }
            _ => {
                warn!("No search parameters in reasoning output, searching for the question itself");
                SearchParams::fallback(question)
            }
        }
    }

    /// The relevant part of one email, or the whole summary if extraction fails.
    pub async fn extract_from_email(&self, email: &MessageSummary, instructions: &str) -> String {
        let rendered = email.to_string();
        match self.gateway.complete(&extraction_prompt(instructions, &rendered), EXTRACTION_SYSTEM).await {
            Ok(text) if !text.trim().is_empty() => format!("From: {} | Subject: {}\n{}", email.from, email.subject, text.trim()),
            Ok(_) => rendered,
            Err(e) => {
                warn!("Extraction failed for \"{}\": {}", email.subject, e);
                rendered
            }
        }
    }

    pub async fn answer(&self, question: &str) -> Result<AgentAnswer, AgentError> {
        let params = self.generate_search_params(question).await;
        let emails = self.search.search(&params.search_query).await?;
        info!("Pipeline search {:?} returned {} email(s)", params.search_query, emails.len());

        if emails.is_empty() {
            return Ok(AgentAnswer {
                answer: NO_EMAILS_ANSWER.to_string(),
                emails: Vec::new(),
            });
        }

        let instructions = params.instructions();
        let excerpts = join_all(emails.iter().map(|e| self.extract_from_email(e, instructions))).await;

        let aggregate = (params.aggregation == Aggregation::Sum).then(|| {
            let category = params
                .category
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| params.search_query.clone());
            sum_amounts(&emails, &category).summary_line(&category)
        });

        let prompt = final_answer_prompt(question, aggregate.as_deref(), &excerpts);
        let answer = match self.gateway.complete(&prompt, FINAL_ANSWER_SYSTEM).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback_answer(aggregate.as_deref(), &excerpts),
            Err(e) => {
                warn!("Final answer generation failed, returning excerpts: {}", e);
                fallback_answer(aggregate.as_deref(), &excerpts)
            }
        };

        Ok(AgentAnswer {
            answer,
            emails: aggregate
                .into_iter()
                .chain(emails.iter().map(ToString::to_string))
                .collect(),
        })
    }
}

fn fallback_answer(aggregate: Option<&str>, excerpts: &[String]) -> String {
    let mut answer = String::from("Here is what I found in your emails:");
    if let Some(line) = aggregate {
        answer.push_str("\n\n");
        answer.push_str(line);
    }
    for excerpt in excerpts {
        answer.push_str("\n\n");
        answer.push_str(excerpt);
    }
    answer
}

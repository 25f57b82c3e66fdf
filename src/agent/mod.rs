// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

pub mod executor;
pub mod pipeline;
pub mod session;

use serde::Serialize;
use std::sync::Arc;

use crate::config::QueryStrategy;
use crate::error::AgentError;
use crate::mail::search::SearchExecutor;
use crate::services::ai::ReasoningGateway;
use crate::services::gmail::MailStore;

pub use executor::AgentExecutor;
pub use pipeline::QueryPipeline;
pub use session::{AgentSession, TriedQueries};

/// A finished answer plus the emails (and sum line) it was based on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentAnswer {
    pub answer: String,
    pub emails: Vec<String>,
}

/// Answers `question` against one user's mailbox with the chosen strategy.
pub async fn answer_question(
    strategy: QueryStrategy,
    gateway: Arc<ReasoningGateway>,
    store: Arc<dyn MailStore>,
    max_iterations: usize,
    question: &str,
) -> Result<AgentAnswer, AgentError> {
    let search = SearchExecutor::new(store);
    match strategy {
        QueryStrategy::Agent => AgentExecutor::new(gateway, search, max_iterations).solve_query(question).await,
        QueryStrategy::Pipeline => QueryPipeline::new(gateway, search).answer(question).await,
    }
}

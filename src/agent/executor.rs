// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// src/agent/executor.rs
// Iterative decide/act loop over the user's mailbox

use log::{debug, info, warn};
use std::sync::Arc;

use super::session::AgentSession;
use super::AgentAnswer;
use crate::error::AgentError;
use crate::mail::aggregate::sum_amounts;
use crate::mail::search::SearchExecutor;
use crate::services::ai::{AgentPlan, ReasoningGateway};

pub const DEFAULT_MAX_ITERATIONS: usize = 5;

pub const PARTIAL_RESULTS_ANSWER: &str =
    "I found some potentially relevant emails, but couldn't reach a complete answer. Here are the emails I found:";

pub struct AgentExecutor {
    gateway: Arc<ReasoningGateway>,
    search: SearchExecutor,
    max_iterations: usize,
}

impl AgentExecutor {
    pub fn new(gateway: Arc<ReasoningGateway>, search: SearchExecutor, max_iterations: usize) -> Self {
        Self {
            gateway,
            search,
            max_iterations: max_iterations.max(1),
        }
    }

    /// Runs the loop until the reasoning service answers or the iteration
    /// ceiling is reached. The last iteration always demands a final answer.
    pub async fn solve_query(&self, question: &str) -> Result<AgentAnswer, AgentError> {
        let mut session = AgentSession::new();

        for iteration in 1..=self.max_iterations {
            session.iteration = iteration;
            let force_final = iteration == self.max_iterations;
            let context = session.render_context(question, self.max_iterations);

            let plan = self.gateway.decide(&context, force_final, &session.tried).await?;
            info!("Iteration {}/{}: {}", iteration, self.max_iterations, plan);

            match plan {
                AgentPlan::Search { query } | AgentPlan::Refine { query } => {
                    let query = query.ok_or_else(|| AgentError::Protocol("search decision without a query".to_string()))?;
                    self.run_search(&mut session, &query).await?;
                }
                AgentPlan::Sum { category, query } => {
                    self.run_sum(&mut session, category, query).await?;
                }
                AgentPlan::Final { answer } => {
                    let Some(answer) = answer else {
                        if force_final {
                            break;
                        }
                        return Err(AgentError::Protocol("final decision without an answer".to_string()));
                    };
                    info!("Answered after {} iteration(s), {} search(es)", iteration, session.tried.len());
                    return Ok(AgentAnswer {
                        answer,
                        emails: session.visible_emails(),
                    });
                }
                AgentPlan::Unrecognized { action } => {
                    return Err(AgentError::Protocol(format!("unrecognized action '{}'", action)));
                }
            }
        }

        // Ceiling reached without a usable final answer.
        if session.all_seen.is_empty() {
            return Err(AgentError::NothingFound { iterations: self.max_iterations });
        }
        warn!("Iteration ceiling reached without an answer; returning seen emails");
        Ok(AgentAnswer {
            answer: PARTIAL_RESULTS_ANSWER.to_string(),
            emails: session.previously_seen().iter().map(ToString::to_string).collect(),
        })
    }

    async fn run_search(&self, session: &mut AgentSession, query: &str) -> Result<(), AgentError> {
        if session.tried.contains(query) {
            warn!("Skipping repeated search {:?}", query);
            if session.candidates.is_empty() {
                session.candidates = session.previously_seen();
            }
            return Ok(());
        }
        let results = self.search.search(query).await?;
        debug!("Search {:?} returned {} email(s)", query, results.len());
        session.record_search(query, results);
        Ok(())
    }

    async fn run_sum(
        &self,
        session: &mut AgentSession,
        category: Option<String>,
        query: Option<String>,
    ) -> Result<(), AgentError> {
        if session.candidates.is_empty() {
            let term = category
                .clone()
                .or_else(|| query.clone())
                .ok_or_else(|| AgentError::Protocol("sum decision without a category or query".to_string()))?;
            self.run_search(session, &term).await?;
        }

        let label = category.or(query).unwrap_or_default();
        let result = sum_amounts(&session.candidates, &label);
        let line = result.summary_line(&label);
        info!("{}", line);
        session.calculated_sum = Some(line);
        Ok(())
    }
}

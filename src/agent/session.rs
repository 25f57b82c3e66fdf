// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-question agent state. Lives for one request and is never shared.

use std::collections::HashSet;

use crate::mail::search::MAX_SUMMARIES;
use crate::mail::types::MessageSummary;

/// Search queries issued so far. Membership ignores case.
#[derive(Debug, Clone, Default)]
pub struct TriedQueries {
    ordered: Vec<String>,
    lowered: HashSet<String>,
}

impl TriedQueries {
    pub fn contains(&self, query: &str) -> bool {
        self.lowered.contains(&normalize(query))
    }

    /// Returns false if an equivalent query was already recorded.
    pub fn insert(&mut self, query: &str) -> bool {
        if !self.lowered.insert(normalize(query)) {
            return false;
        }
        self.ordered.push(query.trim().to_string());
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// `"Flight Booking"` and `flight booking` run the same tier-1 search.
fn normalize(query: &str) -> String {
    query.trim().trim_matches('"').trim().to_lowercase()
}

#[derive(Debug, Default)]
pub struct AgentSession {
    pub iteration: usize,
    pub tried: TriedQueries,
    /// Emails shown to the reasoning service on the next turn.
    pub candidates: Vec<MessageSummary>,
    /// Every email fetched during this session, first-seen order, one per message id.
    pub all_seen: Vec<MessageSummary>,
    /// Latest `CALCULATED SUM` line; shown ahead of the candidates.
    pub calculated_sum: Option<String>,
}

impl AgentSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the results of a search as the new candidate set. An empty
    /// result falls back to what earlier searches found.
    pub fn record_search(&mut self, query: &str, results: Vec<MessageSummary>) {
        self.tried.insert(query);
        self.calculated_sum = None;
        for summary in &results {
            if !self.all_seen.iter().any(|seen| seen.id == summary.id) {
                self.all_seen.push(summary.clone());
            }
        }
        self.candidates = if results.is_empty() {
            self.previously_seen()
        } else {
            results
        };
    }

    /// Up to five emails from earlier searches.
    pub fn previously_seen(&self) -> Vec<MessageSummary> {
        self.all_seen.iter().take(MAX_SUMMARIES).cloned().collect()
    }

    /// The prompt body for the next decision.
    pub fn render_context(&self, question: &str, max_iterations: usize) -> String {
        let tried = if self.tried.is_empty() {
            "none".to_string()
        } else {
            self.tried.iter().map(|q| format!("\"{}\"", q)).collect::<Vec<_>>().join(", ")
        };

        let emails = self.visible_emails();
        let emails = if emails.is_empty() {
            "No emails retrieved yet.".to_string()
        } else {
            emails.join("\n---\n")
        };

        format!(
            "User question: {}\nIteration: {} of {}\nSearch queries already tried: {}\n\nCurrent emails:\n{}",
            question, self.iteration, max_iterations, tried, emails
        )
    }

    /// Candidates as display strings, the sum line first when present.
    pub fn visible_emails(&self) -> Vec<String> {
        self.calculated_sum
            .iter()
            .cloned()
            .chain(self.candidates.iter().map(ToString::to_string))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(subject: &str) -> MessageSummary {
        MessageSummary {
            id: subject.to_string(),
            from: "a@example.com".to_string(),
            subject: subject.to_string(),
            date: "Mon, 1 Jan 2024".to_string(),
            content: "body".to_string(),
        }
    }

    #[test]
    fn test_tried_queries_ignore_case() {
        let mut tried = TriedQueries::default();
        assert!(tried.insert("Flight Booking"));
        assert!(!tried.insert("  flight booking "));
        assert!(tried.contains("FLIGHT BOOKING"));
        assert_eq!(tried.iter().collect::<Vec<_>>(), vec!["Flight Booking"]);
    }

    #[test]
    fn test_tried_queries_ignore_phrase_quotes() {
        let mut tried = TriedQueries::default();
        assert!(tried.insert("flight booking"));
        assert!(tried.contains("\"Flight Booking\""));
        assert!(!tried.insert(" \"FLIGHT BOOKING\" "));
        assert!(!tried.contains("from:indigo"));
    }

    #[test]
    fn test_empty_search_falls_back_to_seen_emails() {
        let mut session = AgentSession::new();
        session.record_search("flights", vec![summary("IndiGo"), summary("Air India")]);
        session.record_search("hotels", vec![]);

        assert_eq!(session.candidates.len(), 2);
        assert_eq!(session.all_seen.len(), 2);
        assert_eq!(session.tried.len(), 2);
    }

    #[test]
    fn test_all_seen_has_no_duplicates() {
        let mut session = AgentSession::new();
        session.record_search("a1", vec![summary("one")]);
        session.record_search("a2", vec![summary("one"), summary("two")]);
        assert_eq!(session.all_seen.len(), 2);
    }

    #[test]
    fn test_identical_looking_messages_kept_apart_by_id() {
        let mut first = summary("Receipt");
        first.id = "m1".to_string();
        let mut second = summary("Receipt");
        second.id = "m2".to_string();
        assert_eq!(first.to_string(), second.to_string());

        let mut session = AgentSession::new();
        session.record_search("receipt", vec![first.clone()]);
        session.record_search("uber receipt", vec![second, first]);
        assert_eq!(session.all_seen.len(), 2);
        assert_eq!(session.previously_seen().len(), 2);
    }

    #[test]
    fn test_sum_line_leads_and_is_cleared_by_search() {
        let mut session = AgentSession::new();
        session.record_search("flights", vec![summary("IndiGo")]);
        session.calculated_sum = Some("CALCULATED SUM: ₹10.00".to_string());

        let visible = session.visible_emails();
        assert_eq!(visible[0], "CALCULATED SUM: ₹10.00");
        assert!(visible[1].contains("Subject: IndiGo"));

        session.record_search("hotels", vec![summary("Taj")]);
        assert!(session.calculated_sum.is_none());
    }

    #[test]
    fn test_render_context() {
        let mut session = AgentSession::new();
        session.iteration = 1;
        let context = session.render_context("How much on flights?", 5);
        assert!(context.contains("User question: How much on flights?"));
        assert!(context.contains("Iteration: 1 of 5"));
        assert!(context.contains("already tried: none"));
        assert!(context.contains("No emails retrieved yet."));

        session.record_search("flight booking", vec![summary("IndiGo")]);
        let context = session.render_context("How much on flights?", 5);
        assert!(context.contains("already tried: \"flight booking\""));
        assert!(context.contains("Subject: IndiGo"));
    }
}

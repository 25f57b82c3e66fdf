// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mailbox search with a three-tier fallback ladder.
//!
//! 1. the query as an exact phrase (operator queries pass through untouched)
//! 2. the query's words joined with `OR`
//! 3. the first word alone
//!
//! A tier only runs when the previous one matched nothing.

use futures::stream::{self, StreamExt};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

use super::parser::parse_message;
use super::types::MessageSummary;
use crate::services::gmail::{MailStore, MailStoreError};

/// Upper bound on ids requested from the mail store per tier.
pub const MAX_CANDIDATE_IDS: u32 = 8;
/// Upper bound on summaries returned by one search.
pub const MAX_SUMMARIES: usize = 5;

/// Search operators that lose their meaning when quoted.
pub const FIELD_OPERATORS: &[&str] = &[
    "from:", "to:", "subject:", "after:", "before:", "newer_than:", "older_than:", "in:", "has:",
    "is:", "label:",
];

lazy_static! {
    /// An operator only counts at the start of a token, optionally negated or grouped.
    static ref FIELD_OPERATOR: Regex = {
        let names: Vec<&str> = FIELD_OPERATORS.iter().map(|op| op.trim_end_matches(':')).collect();
        Regex::new(&format!(r"(?i)(?:^|[\s(])-?(?:{}):", names.join("|"))).unwrap()
    };
}

pub fn has_field_operator(query: &str) -> bool {
    FIELD_OPERATOR.is_match(query)
}

/// Words of `query` with punctuation removed, keeping tokens longer than one character.
pub fn query_tokens(query: &str) -> Vec<String> {
    query
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

/// The ordered, de-duplicated list of queries the ladder will try.
pub fn fallback_queries(query: &str) -> Vec<String> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let exact = if has_field_operator(query) || (query.len() > 1 && query.starts_with('"') && query.ends_with('"')) {
        query.to_string()
    } else {
        format!("\"{}\"", query)
    };

    let mut tiers = vec![exact];
    let tokens = query_tokens(query);
    if let Some(first) = tokens.first() {
        tiers.push(tokens.join(" OR "));
        tiers.push(first.clone());
    }
    tiers.dedup();
    tiers
}

/// Runs searches against one user's mailbox and parses the hits.
#[derive(Clone)]
pub struct SearchExecutor {
    store: Arc<dyn MailStore>,
    max_candidate_ids: u32,
    max_summaries: usize,
}

impl SearchExecutor {
    pub fn new(store: Arc<dyn MailStore>) -> Self {
        Self {
            store,
            max_candidate_ids: MAX_CANDIDATE_IDS,
            max_summaries: MAX_SUMMARIES,
        }
    }

    /// Search with fallback and return at most five parsed summaries.
    /// No hits on any tier is an empty list, not an error.
    pub async fn search(&self, query: &str) -> Result<Vec<MessageSummary>, MailStoreError> {
        let ids = self.find_ids(query).await?;
        if ids.is_empty() {
            info!("No messages matched {:?} at any fallback tier", query);
            return Ok(Vec::new());
        }
        self.fetch_summaries(ids).await
    }

    async fn find_ids(&self, query: &str) -> Result<Vec<String>, MailStoreError> {
        for (tier, candidate) in fallback_queries(query).iter().enumerate() {
            let ids = self.store.search(candidate, self.max_candidate_ids).await?;
            if ids.is_empty() {
                debug!("Search tier {} ({:?}) returned no messages", tier + 1, candidate);
                continue;
            }
            let ids = dedup_ids(ids);
            info!("Search tier {} ({:?}) matched {} message(s)", tier + 1, candidate, ids.len());
            return Ok(ids);
        }
        Ok(Vec::new())
    }

    /// Fetches concurrently but yields in the store's ranking order.
    async fn fetch_summaries(&self, ids: Vec<String>) -> Result<Vec<MessageSummary>, MailStoreError> {
        let store = Arc::clone(&self.store);
        let mut fetches = stream::iter(ids.into_iter().take(self.max_candidate_ids as usize))
            .map(move |id| {
                let store = Arc::clone(&store);
                async move {
                    let result = store.get_message(&id).await;
                    (id, result)
                }
            })
            .buffered(self.max_summaries);

        let mut summaries = Vec::with_capacity(self.max_summaries);
        while let Some((id, result)) = fetches.next().await {
            match result {
                Ok(message) => summaries.push(parse_message(&message)),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("Skipping message {}: {}", id, e),
            }
            if summaries.len() >= self.max_summaries {
                break;
            }
        }
        Ok(summaries)
    }
}

fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::types::{GmailMessage, MessageHeader, MessagePart};
    use crate::services::gmail::MockMailStore;

    fn message(id: &str) -> GmailMessage {
        GmailMessage {
            id: id.to_string(),
            snippet: Some(format!("snippet {}", id)),
            payload: Some(MessagePart {
                headers: vec![MessageHeader { name: "Subject".to_string(), value: format!("Subject {}", id) }],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_query_ladder() {
        assert_eq!(
            fallback_queries("flight tickets, Goa!"),
            vec![
                "\"flight tickets, Goa!\"".to_string(),
                "flight OR tickets OR Goa".to_string(),
                "flight".to_string(),
            ]
        );
    }

    #[test]
    fn test_operator_query_not_phrase_wrapped() {
        let tiers = fallback_queries("from:alice invoice");
        assert_eq!(tiers[0], "from:alice invoice");
    }

    #[test]
    fn test_colon_inside_ordinary_words_is_not_an_operator() {
        assert_eq!(fallback_queries("receipts this: uber")[0], "\"receipts this: uber\"");
        assert_eq!(fallback_queries("failed login: alert")[0], "\"failed login: alert\"");
        assert!(!has_field_operator("photos: beach"));
    }

    #[test]
    fn test_operators_recognized_at_token_start() {
        assert!(has_field_operator("invoice FROM:alice"));
        assert!(has_field_operator("-in:spam receipts"));
        assert!(has_field_operator("(label:travel OR subject:flight)"));
        assert!(has_field_operator("newer_than:7d"));
    }

    #[test]
    fn test_single_char_tokens_dropped() {
        assert_eq!(query_tokens("a b cd e's"), vec!["cd".to_string(), "es".to_string()]);
    }

    #[test]
    fn test_single_token_ladder_skips_duplicate_tier() {
        assert_eq!(fallback_queries("receipts"), vec!["\"receipts\"".to_string(), "receipts".to_string()]);
    }

    #[test]
    fn test_blank_query_has_no_tiers() {
        assert!(fallback_queries("   ").is_empty());
    }

    #[tokio::test]
    async fn test_tier_one_sends_operator_query_verbatim() {
        let mut store = MockMailStore::new();
        store
            .expect_search()
            .withf(|q, max| q == "from:alice newer_than:7d" && *max == MAX_CANDIDATE_IDS)
            .times(1)
            .returning(|_, _| Ok(vec!["m1".to_string()]));
        store
            .expect_get_message()
            .returning(|id| Ok(message(id)));

        let executor = SearchExecutor::new(Arc::new(store));
        let results = executor.search("from:alice newer_than:7d").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].subject, "Subject m1");
    }

    #[tokio::test]
    async fn test_falls_through_all_tiers_to_empty() {
        let mut store = MockMailStore::new();
        store.expect_search().times(3).returning(|_, _| Ok(vec![]));
        store.expect_get_message().never();

        let executor = SearchExecutor::new(Arc::new(store));
        let results = executor.search("uber receipts").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_second_tier_used_when_phrase_misses() {
        let mut store = MockMailStore::new();
        store
            .expect_search()
            .withf(|q, _| q == "\"uber receipts\"")
            .returning(|_, _| Ok(vec![]));
        store
            .expect_search()
            .withf(|q, _| q == "uber OR receipts")
            .returning(|_, _| Ok(vec!["m7".to_string()]));
        store.expect_get_message().returning(|id| Ok(message(id)));

        let executor = SearchExecutor::new(Arc::new(store));
        let results = executor.search("uber receipts").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].subject, "Subject m7");
    }

    #[tokio::test]
    async fn test_caps_results_at_five_and_dedups_ids() {
        let mut store = MockMailStore::new();
        store.expect_search().returning(|_, _| {
            Ok(vec!["a", "a", "b", "c", "d", "e", "f", "g"].into_iter().map(String::from).collect())
        });
        store.expect_get_message().returning(|id| Ok(message(id)));

        let executor = SearchExecutor::new(Arc::new(store));
        let results = executor.search("statements").await.unwrap();
        let subjects: Vec<_> = results.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Subject a", "Subject b", "Subject c", "Subject d", "Subject e"]);
    }

    #[tokio::test]
    async fn test_transient_fetch_failure_skipped_scope_failure_propagates() {
        let mut store = MockMailStore::new();
        store
            .expect_search()
            .returning(|_, _| Ok(vec!["ok".to_string(), "broken".to_string()]));
        store.expect_get_message().returning(|id| {
            if id == "broken" {
                Err(MailStoreError::Api("HTTP 500".to_string()))
            } else {
                Ok(message(id))
            }
        });
        let executor = SearchExecutor::new(Arc::new(store));
        assert_eq!(executor.search("x1").await.unwrap().len(), 1);

        let mut denied = MockMailStore::new();
        denied
            .expect_search()
            .returning(|_, _| Err(MailStoreError::InsufficientScope("scope".to_string())));
        let executor = SearchExecutor::new(Arc::new(denied));
        assert!(matches!(
            executor.search("x1").await,
            Err(MailStoreError::InsufficientScope(_))
        ));
    }
}

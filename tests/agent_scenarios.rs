// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! End-to-end runs of the agent loop against scripted reasoning and an
//! in-memory mailbox.

use std::collections::HashSet;
use std::sync::Arc;

use mailquery::agent::executor::AgentExecutor;
use mailquery::error::AgentError;
use mailquery::mail::aggregate::sum_amounts;
use mailquery::mail::search::SearchExecutor;
use mailquery::services::ai::gateway::{GENERIC_FINAL_ANSWER, OVERLOADED_ANSWER};
use mailquery::services::ai::{ReasoningGateway, RetryPolicy};
use mailquery::test_helpers::{gmail_message, init_logging, InMemoryMailStore, ScriptedProvider};

struct Harness {
    executor: AgentExecutor,
    provider: Arc<ScriptedProvider>,
    store: Arc<InMemoryMailStore>,
}

fn harness(provider: ScriptedProvider, store: InMemoryMailStore) -> Harness {
    init_logging();
    let provider = Arc::new(provider);
    let store = Arc::new(store);
    let gateway = Arc::new(ReasoningGateway::new(provider.clone(), RetryPolicy::immediate(3)));
    Harness {
        executor: AgentExecutor::new(gateway, SearchExecutor::new(store.clone()), 5),
        provider,
        store,
    }
}

fn flight_inbox() -> InMemoryMailStore {
    InMemoryMailStore::new(vec![
        gmail_message(
            "f1",
            "IndiGo <noreply@goindigo.in>",
            "Your flight booking to Goa",
            "Mon, 3 Jun 2024 10:00:00 +0530",
            "Booking confirmed. Paid Rs. 4500 via UPI.",
        ),
        gmail_message(
            "f2",
            "Air India <noreply@airindia.in>",
            "Your flight booking to Pune",
            "Sat, 8 Jun 2024 18:30:00 +0530",
            "Booking confirmed. Paid Rs. 3200 via card.",
        ),
        gmail_message(
            "n1",
            "Newsletter <news@example.com>",
            "Weekly digest",
            "Sun, 9 Jun 2024 08:00:00 +0000",
            "Nothing to see here",
        ),
    ])
}

/// The tier-1 query of every search the store received, lowercased.
fn first_tier_queries(store: &InMemoryMailStore) -> Vec<String> {
    store
        .searches()
        .into_iter()
        .filter(|q| q.starts_with('"') || q.contains(':'))
        .map(|q| q.trim_matches('"').to_lowercase())
        .collect()
}

#[tokio::test]
async fn test_flight_spend_is_summed_and_answered() {
    let provider = ScriptedProvider::new()
        .reply(r#"{"action": "search", "query": "flight booking"}"#)
        .reply(r#"{"action": "sum", "category": "flights"}"#)
        .reply(r#"{"action": "final", "answer": "You spent Rs. 7700 on flights."}"#);
    let h = harness(provider, flight_inbox());

    let result = h.executor.solve_query("what did I spend on flights").await.unwrap();

    assert_eq!(result.answer, "You spent Rs. 7700 on flights.");
    assert!(result.emails[0].starts_with("CALCULATED SUM: Rs.7700.00 for \"flights\""));
    assert_eq!(result.emails.len(), 3);

    // The sum line reached the reasoning service before it answered.
    let prompts = h.provider.prompts();
    assert!(prompts[2].contains("CALCULATED SUM: Rs.7700.00"));
    assert!(prompts[2].contains("already tried: \"flight booking\""));
}

#[test]
fn test_flight_amounts_aggregate_to_7700_rupees() {
    let summaries: Vec<_> = [("Goa", "Paid Rs. 4500"), ("Pune", "Paid Rs. 3200")]
        .iter()
        .map(|(subject, body)| {
            mailquery::mail::parse_message(&gmail_message("x", "a@b.c", subject, "today", body))
        })
        .collect();
    let result = sum_amounts(&summaries, "flights");
    assert_eq!(result.total, 7700.0);
    assert_eq!(result.currency, "Rs.");
}

#[tokio::test]
async fn test_sum_without_candidates_searches_first() {
    let provider = ScriptedProvider::new()
        .reply(r#"{"action": "sum", "category": "flight booking"}"#)
        .reply(r#"{"final": true, "finalAnswer": "Rs. 7700"}"#);
    let h = harness(provider, flight_inbox());

    let result = h.executor.solve_query("total flight spend").await.unwrap();
    assert_eq!(result.answer, "Rs. 7700");
    assert_eq!(h.store.searches()[0], "\"flight booking\"");
    assert!(result.emails[0].contains("Rs.7700.00"));
}

#[tokio::test]
async fn test_nothing_found_still_answers() {
    let provider = ScriptedProvider::new()
        .reply(r#"{"action": "search", "query": "hotel invoice"}"#)
        .reply(r#"{"action": "refine", "query": "hotel stay"}"#)
        .reply(r#"{"action": "search", "query": "from:marriott"}"#)
        .reply(r#"{"action": "search", "query": "resort"}"#)
        .reply(r#"{"action": "search", "query": "airbnb"}"#);
    let h = harness(provider, InMemoryMailStore::new(Vec::new()));

    let result = h.executor.solve_query("how much did I spend on hotels").await.unwrap();

    assert_eq!(result.answer, GENERIC_FINAL_ANSWER);
    assert!(result.emails.is_empty());
    assert_eq!(h.provider.calls(), 5);
    // Every fallback tier was tried for a plain two-word query.
    let searches = h.store.searches();
    assert_eq!(&searches[..3], &["\"hotel invoice\"", "hotel OR invoice", "hotel"]);
}

#[tokio::test]
async fn test_final_flag_shape_is_normalized() {
    let provider = ScriptedProvider::new().reply(r#"{"final": true, "finalAnswer": "X"}"#);
    let h = harness(provider, flight_inbox());

    let result = h.executor.solve_query("anything").await.unwrap();
    assert_eq!(result.answer, "X");
    assert!(h.store.searches().is_empty());
}

#[tokio::test]
async fn test_overloaded_service_still_yields_an_answer() {
    let provider = ScriptedProvider::new().overloaded(50);
    let h = harness(provider, flight_inbox());

    let result = h.executor.solve_query("what did I spend on flights").await.unwrap();
    assert_eq!(result.answer, OVERLOADED_ANSWER);
    assert!(!result.answer.is_empty());
    // One decision, three attempts.
    assert_eq!(h.provider.calls(), 3);
}

#[tokio::test]
async fn test_timed_out_service_still_yields_an_answer() {
    let provider = ScriptedProvider::new().timed_out(3);
    let h = harness(provider, flight_inbox());

    let result = h.executor.solve_query("what did I spend on flights").await.unwrap();
    assert_eq!(result.answer, OVERLOADED_ANSWER);
    assert_eq!(h.provider.calls(), 3);
}

#[tokio::test]
async fn test_overload_mid_session_keeps_emails() {
    let provider = ScriptedProvider::new()
        .reply(r#"{"action": "search", "query": "flight booking"}"#)
        .overloaded(3);
    let h = harness(provider, flight_inbox());

    let result = h.executor.solve_query("flights?").await.unwrap();
    assert_eq!(result.answer, OVERLOADED_ANSWER);
    assert_eq!(result.emails.len(), 2);
}

#[tokio::test]
async fn test_never_repeats_a_search_and_stops_at_five_iterations() {
    // The model keeps asking for the same query in different casing.
    let mut provider = ScriptedProvider::new();
    for _ in 0..12 {
        provider = provider.reply(r#"{"action": "search", "query": "Flight Booking"}"#);
    }
    let h = harness(provider, flight_inbox());

    let result = h.executor.solve_query("flights?").await.unwrap();
    assert!(!result.answer.is_empty());

    let tier_one = first_tier_queries(&h.store);
    let unique: HashSet<_> = tier_one.iter().collect();
    assert_eq!(tier_one.len(), unique.len(), "repeated search: {:?}", tier_one);
    assert_eq!(tier_one, vec!["flight booking"]);

    // Iterations 2-4 each re-ask once on the duplicate; iteration 5 is forced final.
    assert_eq!(h.provider.calls(), 1 + 3 * 2 + 1);
}

#[tokio::test]
async fn test_quoted_repeat_of_a_search_is_not_sent_again() {
    let provider = ScriptedProvider::new()
        .reply(r#"{"action": "search", "query": "flight booking"}"#)
        .reply(r#"{"action": "search", "query": "\"Flight Booking\""}"#)
        .reply(r#"{"action": "refine", "query": "\"FLIGHT booking\""}"#)
        .reply(r#"{"action": "final", "answer": "Two flights."}"#);
    let h = harness(provider, flight_inbox());

    let result = h.executor.solve_query("flights?").await.unwrap();
    assert_eq!(result.answer, "Two flights.");
    assert_eq!(h.store.searches(), vec!["\"flight booking\""]);
    // The quoted repeat triggered exactly one re-ask.
    assert_eq!(h.provider.calls(), 4);
}

#[tokio::test]
async fn test_unrecognized_action_is_protocol_error() {
    let provider = ScriptedProvider::new().reply(r#"{"action": "delete", "query": "all"}"#);
    let h = harness(provider, flight_inbox());

    let err = h.executor.solve_query("clean my inbox").await.unwrap_err();
    assert!(matches!(err, AgentError::Protocol(_)));
}

#[tokio::test]
async fn test_search_without_query_is_protocol_error() {
    let provider = ScriptedProvider::new().reply(r#"{"action": "search"}"#);
    let h = harness(provider, flight_inbox());

    let err = h.executor.solve_query("flights").await.unwrap_err();
    assert!(matches!(err, AgentError::Protocol(_)));
}

#[tokio::test]
async fn test_non_json_decision_aborts() {
    let provider = ScriptedProvider::new().reply("Sure, I'll search your flights.");
    let h = harness(provider, flight_inbox());

    let err = h.executor.solve_query("flights").await.unwrap_err();
    assert!(matches!(err, AgentError::MalformedOutput(_)));
}

#[tokio::test]
async fn test_forced_final_without_answer_returns_seen_emails() {
    let provider = ScriptedProvider::new()
        .reply(r#"{"action": "search", "query": "flight booking"}"#)
        .reply(r#"{"action": "search", "query": "from:indigo"}"#)
        .reply(r#"{"action": "search", "query": "from:airindia"}"#)
        .reply(r#"{"action": "search", "query": "boarding pass"}"#)
        .reply(r#"{"action": "final"}"#);
    let h = harness(provider, flight_inbox());

    let result = h.executor.solve_query("flights?").await.unwrap();
    assert!(result.answer.starts_with("I found some potentially relevant emails"));
    assert_eq!(result.emails.len(), 2);
}

#[tokio::test]
async fn test_forced_final_without_answer_or_emails_is_nothing_found() {
    let provider = ScriptedProvider::new()
        .reply(r#"{"action": "search", "query": "a1"}"#)
        .reply(r#"{"action": "search", "query": "b2"}"#)
        .reply(r#"{"action": "search", "query": "c3"}"#)
        .reply(r#"{"action": "search", "query": "d4"}"#)
        .reply(r#"{"action": "final"}"#);
    let h = harness(provider, InMemoryMailStore::new(Vec::new()));

    let err = h.executor.solve_query("?").await.unwrap_err();
    assert!(matches!(err, AgentError::NothingFound { iterations: 5 }));
}

#[tokio::test]
async fn test_scope_error_aborts_loop() {
    let provider = ScriptedProvider::new().reply(r#"{"action": "search", "query": "flights"}"#);
    let h = harness(provider, InMemoryMailStore::without_read_scope());

    let err = h.executor.solve_query("flights").await.unwrap_err();
    assert!(matches!(err, AgentError::UpstreamScope(_)));
}

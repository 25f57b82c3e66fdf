// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Monetary totals over a set of message summaries.
//!
//! Every pattern registered for a category is applied to every email and all
//! matches are summed. Overlapping patterns can count the same amount twice;
//! that is the current contract and callers rely on totals being reproducible.

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::MessageSummary;

/// Currency reported when no match carried a currency marker.
pub const DEFAULT_CURRENCY: &str = "₹";

const CURRENCY: &str = r"(₹|Rs\.|INR|USD|\$)";
const AMOUNT: &str = r"(\d[\d,]*(?:\.\d+)?)";

fn bare_pattern() -> Regex {
    Regex::new(&format!(r"{}\s*{}", CURRENCY, AMOUNT)).unwrap()
}

fn keyword_pattern(keywords: &str) -> Regex {
    Regex::new(&format!(r"(?i)(?:{})\W{{0,20}}{}\s*{}", keywords, CURRENCY, AMOUNT)).unwrap()
}

lazy_static! {
    /// Known categories, matched by lower-case substring of the requested category.
    static ref CATEGORY_PATTERNS: Vec<(&'static str, Vec<Regex>)> = vec![
        ("flight", vec![keyword_pattern("total fare|fare|total"), bare_pattern()]),
        ("hotel", vec![keyword_pattern("room charges|total|amount due"), bare_pattern()]),
        ("subscription", vec![keyword_pattern("renewal|billed|charged|plan"), bare_pattern()]),
        ("food", vec![keyword_pattern("order total|grand total|total"), bare_pattern()]),
    ];
    static ref DEFAULT_PATTERNS: Vec<Regex> = vec![bare_pattern()];
}

/// One matched amount and the email it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountDetail {
    pub from: String,
    pub subject: String,
    pub date: String,
    pub amount: f64,
    pub currency: String,
    pub matched_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub total: f64,
    pub currency: String,
    pub details: Vec<AmountDetail>,
}

impl AggregationResult {
    /// Synthetic line fed back to the reasoning service as context.
    pub fn summary_line(&self, category: &str) -> String {
        format!(
            "CALCULATED SUM: {}{:.2} for \"{}\" across {} matched amount(s)",
            self.currency,
            self.total,
            category,
            self.details.len()
        )
    }
}

fn patterns_for(category: &str) -> &'static [Regex] {
    let lowered = category.to_lowercase();
    CATEGORY_PATTERNS
        .iter()
        .find(|(key, _)| lowered.contains(key))
        .map(|(key, patterns)| {
            debug!("Category '{}' matched pattern set '{}'", category, key);
            patterns.as_slice()
        })
        .unwrap_or_else(|| {
            debug!("Category '{}' has no dedicated patterns, using defaults", category);
            DEFAULT_PATTERNS.as_slice()
        })
}

/// Sum every monetary amount found in `emails` using the patterns for `category`.
pub fn sum_amounts(emails: &[MessageSummary], category: &str) -> AggregationResult {
    let patterns = patterns_for(category);
    let mut total = 0.0;
    let mut details = Vec::new();
    // Insertion-ordered so ties resolve to the first currency seen.
    let mut currency_counts: Vec<(String, usize)> = Vec::new();

    for email in emails {
        let text = email.to_string();
        for pattern in patterns {
            for caps in pattern.captures_iter(&text) {
                let (Some(whole), Some(symbol), Some(raw)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                    continue;
                };
                let amount = match raw.as_str().replace(',', "").parse::<f64>() {
                    Ok(value) => value,
                    Err(e) => {
                        warn!("Discarding unparseable amount '{}': {}", raw.as_str(), e);
                        continue;
                    }
                };

                total += amount;
                let symbol = symbol.as_str().to_string();
                match currency_counts.iter_mut().find(|(s, _)| *s == symbol) {
                    Some((_, count)) => *count += 1,
                    None => currency_counts.push((symbol.clone(), 1)),
                }
                details.push(AmountDetail {
                    from: email.from.clone(),
                    subject: email.subject.clone(),
                    date: email.date.clone(),
                    amount,
                    currency: symbol,
                    matched_text: whole.as_str().to_string(),
                });
            }
        }
    }

    let mut dominant: Option<(&str, usize)> = None;
    for (symbol, count) in &currency_counts {
        if dominant.map_or(true, |(_, best)| *count > best) {
            dominant = Some((symbol.as_str(), *count));
        }
    }
    let currency = dominant
        .map(|(symbol, _)| symbol.to_string())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    debug!(
        "Aggregated {} amount(s) for '{}': {}{}",
        details.len(),
        category,
        currency,
        total
    );

    AggregationResult { total, currency, details }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(subject: &str, content: &str) -> MessageSummary {
        MessageSummary {
            id: subject.to_string(),
            from: "bookings@airline.example".to_string(),
            subject: subject.to_string(),
            date: "Mon, 3 Jun 2024".to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_flight_amounts_summed_with_dominant_currency() {
        let emails = vec![
            email("Trip to Goa", "Booking confirmed. Paid Rs. 4500 via UPI."),
            email("Trip to Pune", "Booking confirmed. Paid Rs. 3200 via card."),
        ];
        let result = sum_amounts(&emails, "flights");
        assert_eq!(result.total, 7700.0);
        assert_eq!(result.currency, "Rs.");
        assert_eq!(result.details.len(), 2);
        assert_eq!(result.details[0].matched_text, "Rs. 4500");
        assert_eq!(result.details[1].subject, "Trip to Pune");
    }

    #[test]
    fn test_thousands_separators_and_decimals() {
        let emails = vec![email("Invoice", "Charged USD 1,234.50 today")];
        let result = sum_amounts(&emails, "misc");
        assert_eq!(result.total, 1234.5);
        assert_eq!(result.currency, "USD");
    }

    #[test]
    fn test_no_matches_defaults_to_rupee() {
        let emails = vec![email("Hello", "No money mentioned here")];
        let result = sum_amounts(&emails, "flight");
        assert_eq!(result.total, 0.0);
        assert_eq!(result.currency, DEFAULT_CURRENCY);
        assert!(result.details.is_empty());
    }

    #[test]
    fn test_unknown_category_uses_default_patterns() {
        // "Total" keyword patterns only exist for known categories, so an
        // unknown category counts the amount exactly once.
        let emails = vec![email("Order", "Total: $20")];
        let unknown = sum_amounts(&emails, "zzz-unknown");
        assert_eq!(unknown.total, 20.0);
        assert_eq!(unknown.details.len(), 1);

        let known = sum_amounts(&emails, "food delivery");
        assert_eq!(known.details.len(), 2);
        assert_eq!(known.total, 40.0);
    }

    #[test]
    fn test_dominant_currency_is_most_frequent() {
        let emails = vec![
            email("A", "$5 and ₹100 and ₹200"),
            email("B", "₹300"),
        ];
        let result = sum_amounts(&emails, "other");
        assert_eq!(result.currency, "₹");
        assert_eq!(result.details.len(), 4);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let emails = vec![
            email("Netflix", "Your plan renewal: INR 649 billed"),
            email("Spotify", "Charged ₹119"),
        ];
        let first = sum_amounts(&emails, "Subscriptions");
        let second = sum_amounts(&emails, "Subscriptions");
        assert_eq!(first, second);
    }

    #[test]
    fn test_summary_line_format() {
        let result = AggregationResult {
            total: 7700.0,
            currency: "Rs.".to_string(),
            details: vec![],
        };
        assert_eq!(
            result.summary_line("flights"),
            "CALCULATED SUM: Rs.7700.00 for \"flights\" across 0 matched amount(s)"
        );
    }
}

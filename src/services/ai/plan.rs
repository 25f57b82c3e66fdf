// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The agent's next-step decision and the mapping from the JSON shapes the
//! reasoning service actually emits onto it.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

const TAG_KEYS: &[&str] = &["action", "type"];
const NESTED_TAGS: &[&str] = &["search", "refine", "sum", "final"];
const QUERY_KEYS: &[&str] = &["query", "searchQuery", "search_query"];
const CATEGORY_KEYS: &[&str] = &["category"];
const ANSWER_KEYS: &[&str] = &["answer", "finalAnswer", "final_answer"];

/// What the agent should do next. Required fields stay optional here; the
/// agent loop rejects plans that lack them.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentPlan {
    Search { query: Option<String> },
    /// Handled exactly like `Search`; kept distinct for logging.
    Refine { query: Option<String> },
    Sum { category: Option<String>, query: Option<String> },
    Final { answer: Option<String> },
    Unrecognized { action: String },
}

impl AgentPlan {
    pub fn tag(&self) -> &str {
        match self {
            AgentPlan::Search { .. } => "search",
            AgentPlan::Refine { .. } => "refine",
            AgentPlan::Sum { .. } => "sum",
            AgentPlan::Final { .. } => "final",
            AgentPlan::Unrecognized { action } => action,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, AgentPlan::Final { .. })
    }

    /// The query of a `Search`/`Refine` plan.
    pub fn search_query(&self) -> Option<&str> {
        match self {
            AgentPlan::Search { query } | AgentPlan::Refine { query } => query.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for AgentPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentPlan::Search { query } => write!(f, "search {:?}", query),
            AgentPlan::Refine { query } => write!(f, "refine {:?}", query),
            AgentPlan::Sum { category, query } => write!(f, "sum category={:?} query={:?}", category, query),
            AgentPlan::Final { .. } => write!(f, "final"),
            AgentPlan::Unrecognized { action } => write!(f, "unrecognized action '{}'", action),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("response is not valid JSON")]
    NotJson,

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("response matches no known plan shape: {0}")]
    UnknownShape(String),
}

/// Every shape the reasoning service has been seen to produce.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanShape {
    /// `{"action": "search", "query": "..."}`; `type` is accepted for `action`.
    Tagged { action: String, fields: Map<String, Value> },
    /// `{"final": true, "finalAnswer": "..."}`
    FinalFlag { fields: Map<String, Value> },
    /// `{"search": {"query": "..."}}`
    Nested { action: String, fields: Map<String, Value> },
    /// `{"search": "..."}`
    Shorthand { action: String, value: String },
}

impl PlanShape {
    pub fn classify(value: &Value) -> Result<PlanShape, PlanError> {
        let object = value.as_object().ok_or(PlanError::NotAnObject)?;

        if let Some(action) = TAG_KEYS.iter().find_map(|k| object.get(*k).and_then(Value::as_str)) {
            return Ok(PlanShape::Tagged {
                action: action.to_string(),
                fields: object.clone(),
            });
        }

        if object.get("final").and_then(Value::as_bool) == Some(true) {
            return Ok(PlanShape::FinalFlag { fields: object.clone() });
        }

        for tag in NESTED_TAGS {
            match object.get(*tag) {
                Some(Value::Object(inner)) => {
                    return Ok(PlanShape::Nested {
                        action: tag.to_string(),
                        fields: inner.clone(),
                    })
                }
                Some(Value::String(text)) => {
                    return Ok(PlanShape::Shorthand {
                        action: tag.to_string(),
                        value: text.clone(),
                    })
                }
                _ => {}
            }
        }

        Err(PlanError::UnknownShape(value.to_string()))
    }

    pub fn into_plan(self) -> AgentPlan {
        match self {
            PlanShape::Tagged { action, fields } | PlanShape::Nested { action, fields } => plan_from_fields(&action, &fields),
            PlanShape::FinalFlag { fields } => AgentPlan::Final {
                answer: text_field(&fields, ANSWER_KEYS),
            },
            PlanShape::Shorthand { action, value } => {
                let value = non_empty(&value);
                match action.as_str() {
                    "search" => AgentPlan::Search { query: value },
                    "refine" => AgentPlan::Refine { query: value },
                    "sum" => AgentPlan::Sum { category: value, query: None },
                    "final" => AgentPlan::Final { answer: value },
                    other => AgentPlan::Unrecognized { action: other.to_string() },
                }
            }
        }
    }
}

fn plan_from_fields(action: &str, fields: &Map<String, Value>) -> AgentPlan {
    match action.trim().to_lowercase().as_str() {
        "search" => AgentPlan::Search { query: text_field(fields, QUERY_KEYS) },
        "refine" => AgentPlan::Refine { query: text_field(fields, QUERY_KEYS) },
        "sum" => AgentPlan::Sum {
            category: text_field(fields, CATEGORY_KEYS),
            query: text_field(fields, QUERY_KEYS),
        },
        "final" => AgentPlan::Final { answer: text_field(fields, ANSWER_KEYS) },
        _ => AgentPlan::Unrecognized { action: action.to_string() },
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn text_field(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| fields.get(*k).and_then(Value::as_str))
        .and_then(non_empty)
}

/// Any answer text present in a decision, whatever its action.
pub fn answer_hint(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    text_field(object, ANSWER_KEYS).or_else(|| match object.get("final") {
        Some(Value::Object(inner)) => text_field(inner, ANSWER_KEYS),
        _ => None,
    })
}

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").unwrap();
}

/// Pulls a JSON value out of model output, tolerating code fences and prose
/// around a single object.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    if let Some(inner) = CODE_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        if let Ok(value) = serde_json::from_str::<Value>(inner.as_str()) {
            return Some(value);
        }
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
}

/// Parse and normalize a raw decision into a plan.
pub fn parse_plan(text: &str) -> Result<(AgentPlan, Value), PlanError> {
    let value = extract_json(text).ok_or(PlanError::NotJson)?;
    let plan = PlanShape::classify(&value)?.into_plan();
    Ok((plan, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_tagged_shape() {
        let (plan, _) = parse_plan(r#"{"action": "search", "query": "flight booking"}"#).unwrap();
        assert_eq!(plan, AgentPlan::Search { query: Some("flight booking".to_string()) });
    }

    #[test]
    fn test_type_key_accepted_as_tag() {
        let (plan, _) = parse_plan(r#"{"type": "Refine", "searchQuery": "from:indigo"}"#).unwrap();
        assert_eq!(plan, AgentPlan::Refine { query: Some("from:indigo".to_string()) });
    }

    #[test]
    fn test_final_flag_shape() {
        let (plan, _) = parse_plan(r#"{"final": true, "finalAnswer": "X"}"#).unwrap();
        assert_eq!(plan, AgentPlan::Final { answer: Some("X".to_string()) });
    }

    #[test]
    fn test_nested_shape() {
        let (plan, _) = parse_plan(r#"{"sum": {"category": "flights"}}"#).unwrap();
        assert_eq!(plan, AgentPlan::Sum { category: Some("flights".to_string()), query: None });

        let (plan, _) = parse_plan(r#"{"final": {"answer": "Done"}}"#).unwrap();
        assert_eq!(plan, AgentPlan::Final { answer: Some("Done".to_string()) });
    }

    #[test]
    fn test_shorthand_shape() {
        let (plan, _) = parse_plan(r#"{"search": "uber receipts"}"#).unwrap();
        assert_eq!(plan, AgentPlan::Search { query: Some("uber receipts".to_string()) });
    }

    #[test]
    fn test_missing_fields_stay_empty() {
        let (plan, _) = parse_plan(r#"{"action": "search", "query": "  "}"#).unwrap();
        assert_eq!(plan, AgentPlan::Search { query: None });
    }

    #[test]
    fn test_unknown_action_is_unrecognized() {
        let (plan, _) = parse_plan(r#"{"action": "delete_everything"}"#).unwrap();
        assert_eq!(plan, AgentPlan::Unrecognized { action: "delete_everything".to_string() });
    }

    #[test]
    fn test_non_json_and_unknown_shapes_rejected() {
        assert_eq!(parse_plan("I think you should search").unwrap_err(), PlanError::NotJson);
        assert_eq!(parse_plan("[1, 2]").unwrap_err(), PlanError::NotAnObject);
        assert!(matches!(parse_plan(r#"{"final": false}"#), Err(PlanError::UnknownShape(_))));
    }

    #[test]
    fn test_code_fenced_json_extracted() {
        let text = "Here you go:\n```json\n{\"action\": \"final\", \"answer\": \"42\"}\n```";
        let (plan, _) = parse_plan(text).unwrap();
        assert_eq!(plan, AgentPlan::Final { answer: Some("42".to_string()) });
    }

    #[test]
    fn test_object_embedded_in_prose_extracted() {
        let value = extract_json("Sure! {\"action\": \"sum\", \"category\": \"food\"} hope that helps").unwrap();
        assert_eq!(value["category"], "food");
    }

    #[test]
    fn test_answer_hint_found_on_non_final_plan() {
        let value = json!({"action": "search", "query": "x", "answer": "partial answer"});
        assert_eq!(answer_hint(&value).as_deref(), Some("partial answer"));
        assert_eq!(answer_hint(&json!({"final": {"finalAnswer": "nested"}})).as_deref(), Some("nested"));
        assert_eq!(answer_hint(&json!({"action": "search"})), None);
    }
}

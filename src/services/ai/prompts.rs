// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// src/services/ai/prompts.rs
// Prompt templates for every call made to the reasoning service

pub const DECISION_SYSTEM: &str = r#"
You are an email research agent working over the user's Gmail inbox.
Each turn you receive the user's question, the search queries already tried and
the emails currently in hand. Choose exactly one next step.

Respond ONLY with a JSON object in one of these forms:
{"action": "search", "query": "<Gmail search query>"}
{"action": "refine", "query": "<a different, better Gmail search query>"}
{"action": "sum", "category": "<spending category, e.g. flights>", "query": "<optional Gmail search query>"}
{"action": "final", "answer": "<complete answer for the user>"}

Rules:
- Gmail operators such as from:, subject:, after:, newer_than: are allowed in queries.
- Never repeat a query that has already been tried.
- Use "sum" when the question asks for a total amount of money.
- Use "final" as soon as the emails answer the question.
"#;

pub const FORCE_FINAL_INSTRUCTION: &str =
    "This is the last step. You MUST respond with {\"action\": \"final\", \"answer\": \"...\"} using what you have.";

pub const DUPLICATE_QUERY_INSTRUCTION: &str =
    "The query \"{query}\" has already been tried. Respond with a DIFFERENT search query, or with a final answer.";

pub const SEARCH_PARAMS_SYSTEM: &str = r#"
You convert questions about an email inbox into Gmail search parameters.
Respond ONLY with a JSON object:
{
  "searchQuery": "<Gmail search query>",
  "extractionInstructions": "<what to pull out of each matching email>",
  "aggregation": "none" | "sum",
  "category": "<spending category when aggregation is sum, otherwise empty>"
}
"#;

pub const SEARCH_PARAMS_TEMPLATE: &str = "User question: {query}";

pub const EXTRACTION_SYSTEM: &str =
    "You read a single email and extract only the information requested. Reply in one or two short sentences. If the email has nothing relevant, reply \"Not relevant\".";

pub const EXTRACTION_TEMPLATE: &str = r#"
Instructions: {instructions}

Email:
{email}
"#;

pub const FINAL_ANSWER_SYSTEM: &str =
    "You answer questions about the user's inbox using only the email excerpts provided. Be concise and mention amounts, dates and senders when relevant.";

pub const FINAL_ANSWER_TEMPLATE: &str = r#"
Question: {query}

{aggregate}
Email excerpts:
{excerpts}
"#;

pub const DEFAULT_EXTRACTION_INSTRUCTIONS: &str =
    "Summarize the parts of this email that help answer the user's question, including any amounts, dates and senders.";

pub fn duplicate_query_instruction(query: &str) -> String {
    DUPLICATE_QUERY_INSTRUCTION.replace("{query}", query)
}

pub fn search_params_prompt(query: &str) -> String {
    SEARCH_PARAMS_TEMPLATE.replace("{query}", query)
}

pub fn extraction_prompt(instructions: &str, email: &str) -> String {
    EXTRACTION_TEMPLATE
        .replace("{instructions}", instructions)
        .replace("{email}", email)
}

pub fn final_answer_prompt(query: &str, aggregate: Option<&str>, excerpts: &[String]) -> String {
    let aggregate = aggregate.map(|line| format!("{}\n", line)).unwrap_or_default();
    FINAL_ANSWER_TEMPLATE
        .replace("{query}", query)
        .replace("{aggregate}", &aggregate)
        .replace("{excerpts}", &excerpts.join("\n---\n"))
}

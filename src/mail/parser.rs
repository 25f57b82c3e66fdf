// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns a raw mail-store message into a [`MessageSummary`].

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use log::{debug, warn};

use super::types::{GmailMessage, MessagePart, MessageSummary};

pub const NO_SUBJECT: &str = "No Subject";
pub const UNKNOWN_SENDER: &str = "Unknown Sender";
pub const NO_DATE: &str = "No Date";
pub const NO_CONTENT: &str = "No content available";

/// Maximum number of characters of content kept in a summary.
pub const MAX_CONTENT_CHARS: usize = 200;

/// Standard alphabet that tolerates both padded and unpadded input.
const BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Parse a message into its summary. Never fails: missing pieces fall back to defaults.
pub fn parse_message(message: &GmailMessage) -> MessageSummary {
    let header = |name: &str| {
        message
            .payload
            .as_ref()
            .and_then(|p| p.headers.iter().find(|h| h.name == name))
            .map(|h| h.value.clone())
    };

    let subject = header("Subject").unwrap_or_else(|| NO_SUBJECT.to_string());
    let from = header("From").unwrap_or_else(|| UNKNOWN_SENDER.to_string());
    let date = header("Date").unwrap_or_else(|| NO_DATE.to_string());

    let body = message
        .payload
        .as_ref()
        .map(extract_body)
        .unwrap_or_default();

    let content = if !body.is_empty() {
        body
    } else {
        match message.snippet.as_deref().map(str::trim) {
            Some(snippet) if !snippet.is_empty() => snippet.to_string(),
            _ => NO_CONTENT.to_string(),
        }
    };

    debug!("Parsed message {} ({} chars of content)", message.id, content.chars().count());

    MessageSummary {
        id: message.id.clone(),
        from,
        subject,
        date,
        content: truncate_content(&content),
    }
}

/// Depth-first walk of the part tree, concatenating every decodable body.
pub fn extract_body(root: &MessagePart) -> String {
    let mut out = String::new();
    collect_parts(root, &mut out);
    out.trim().to_string()
}

fn collect_parts(part: &MessagePart, out: &mut String) {
    if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
        match decode_body_data(data) {
            Some(text) => {
                out.push_str(&strip_control_chars(&text));
                out.push('\n');
            }
            None => warn!(
                "Skipping undecodable body fragment ({})",
                part.mime_type.as_deref().unwrap_or("unknown mime type")
            ),
        }
    }
    for child in &part.parts {
        collect_parts(child, out);
    }
}

/// Decode base64 body data, accepting the URL-safe alphabet the mail store uses.
pub fn decode_body_data(data: &str) -> Option<String> {
    let normalized: String = data
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    BODY_ENGINE
        .decode(normalized.as_bytes())
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Removes C0 (U+0000-U+001F) and C1 (U+007F-U+009F) control characters.
pub fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(*c as u32, 0x00..=0x1F | 0x7F..=0x9F))
        .collect()
}

pub fn truncate_content(content: &str) -> String {
    if content.chars().count() <= MAX_CONTENT_CHARS {
        return content.to_string();
    }
    let head: String = content.chars().take(MAX_CONTENT_CHARS).collect();
    format!("{}...", head)
}

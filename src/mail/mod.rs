// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mailbox content: message parsing, amount aggregation and search.

pub mod aggregate;
pub mod parser;
pub mod search;
pub mod types;

pub use aggregate::{sum_amounts, AggregationResult};
pub use parser::parse_message;
pub use search::SearchExecutor;
pub use types::{GmailMessage, MessageSummary};

// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Library core for mailquery: answers natural-language questions about a
//! user's Gmail inbox.

// --- Modules ---
pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod mail;
pub mod services;
pub mod test_helpers;

// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! HTTP API implementation using Actix Web.

pub mod auth;
pub mod errors;
pub mod pages;
pub mod query;
pub mod routes;

use std::sync::Arc;

use crate::config::Settings;
use crate::services::ai::ReasoningGateway;
use crate::services::gmail::MailStoreFactory;
use crate::services::oauth_service::IdentityProvider;

/// Shared, read-only state handed to every handler. Nothing per-user lives here.
pub struct AppState {
    pub settings: Settings,
    pub identity: Arc<dyn IdentityProvider>,
    pub mail_stores: Arc<dyn MailStoreFactory>,
    pub gateway: Arc<ReasoningGateway>,
}

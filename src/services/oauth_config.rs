// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! OAuth2 configuration for Google sign-in with read-only Gmail access.
//!
//! Google endpoints are constants; client credentials come from [`Settings`].

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::Settings;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Read-only mailbox access is all the app ever asks for.
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Full callback URI, e.g. "http://localhost:3000/api/auth/callback".
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
}

impl GoogleOAuthConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let config = Self {
            client_id: settings.google.client_id.clone(),
            client_secret: settings.google.client_secret.clone(),
            redirect_uri: settings.redirect_uri(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        };
        if config.is_configured() {
            info!("Google OAuth2 configured (redirect_uri={})", config.redirect_uri);
        } else {
            debug!("Google OAuth2 not configured (set GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET)");
        }
        config
    }

    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

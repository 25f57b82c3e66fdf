// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error responses for the HTTP API.
//!
//! Every failure is a JSON body with a human-readable `answer` and a
//! diagnostic `error`; only those two fields and the status code vary.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AgentError;

pub const SIGN_IN_ANSWER: &str = "Please sign in with Google so I can read your email, then ask again.";

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub answer: String,
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No session token supplied")]
    MissingToken,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Agent(#[from] AgentError),
}

impl ApiError {
    pub fn answer(&self) -> &str {
        match self {
            ApiError::MissingToken => SIGN_IN_ANSWER,
            ApiError::BadRequest(_) => "Please send a question as JSON: {\"query\": \"...\"}.",
            ApiError::Agent(e) => e.user_message(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingToken | ApiError::Agent(AgentError::Authentication(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Agent(AgentError::UpstreamScope(_)) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Agent(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, self);
        } else {
            warn!("Request rejected ({}): {}", status, self);
        }
        HttpResponse::build(status).json(ErrorResponse {
            answer: self.answer().to_string(),
            error: self.to_string(),
        })
    }
}

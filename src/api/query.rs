// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use actix_web::{web, HttpResponse};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::auth::{session_cookie, ACCESS_TOKEN_COOKIE, ACCESS_TOKEN_MAX_AGE_SECS};
use super::errors::ApiError;
use super::AppState;
use crate::agent::answer_question;
use crate::error::AgentError;
use crate::services::oauth_service::Credentials;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub token: Option<Credentials>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<String>>,
}

/// POST /api/query
///
/// Refreshes the access token once, then answers the question against the
/// caller's mailbox.
pub async fn query(state: web::Data<AppState>, body: web::Json<QueryRequest>) -> Result<HttpResponse, ApiError> {
    let QueryRequest { query, token } = body.into_inner();

    let refresh_token = token
        .and_then(|t| t.refresh_token)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::MissingToken)?;

    let question = query.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let refreshed = state.identity.refresh(&refresh_token).await.map_err(|e| {
        warn!("Access token refresh failed: {}", e);
        AgentError::Authentication(e.to_string())
    })?;

    info!("Answering question with {:?} strategy", state.settings.agent.strategy);
    let store = state.mail_stores.for_access_token(&refreshed.access_token);
    let result = answer_question(
        state.settings.agent.strategy,
        state.gateway.clone(),
        store,
        state.settings.agent.max_iterations,
        question,
    )
    .await?;

    let max_age = access_cookie_max_age(refreshed.expires_at, chrono::Utc::now().timestamp());
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(
            ACCESS_TOKEN_COOKIE,
            refreshed.access_token,
            max_age,
            state.settings.server.secure_cookies,
        ))
        .json(QueryResponse {
            answer: result.answer,
            emails: (!result.emails.is_empty()).then_some(result.emails),
        }))
}

/// The access cookie lives as long as the token does, never past the usual hour.
fn access_cookie_max_age(expires_at: i64, now: i64) -> i64 {
    match expires_at - now {
        remaining if remaining > 0 => remaining.min(ACCESS_TOKEN_MAX_AGE_SECS),
        _ => ACCESS_TOKEN_MAX_AGE_SECS,
    }
}

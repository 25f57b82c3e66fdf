// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Google sign-in endpoints, session cookies and the page guards.
//!
//! The browser holds the token pair in http-only cookies. A session counts
//! as authenticated when the refresh token cookie is present.

use actix_web::{
    body::MessageBody,
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    dev::{ServiceRequest, ServiceResponse},
    http::header::LOCATION,
    web, Error as ActixError, HttpRequest, HttpResponse,
};
use actix_web_lab::middleware::Next;
use log::{debug, error, info, warn};
use serde::Deserialize;

use super::AppState;
use crate::services::oauth_service::{generate_random_string, Credentials, OAuthError};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

pub const ACCESS_TOKEN_MAX_AGE_SECS: i64 = 60 * 60;
pub const REFRESH_TOKEN_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;
const OAUTH_STATE_MAX_AGE_SECS: i64 = 10 * 60;

pub const ENTRY_PATH: &str = "/";
pub const PROTECTED_PATH: &str = "/dashboard";

pub fn session_cookie(name: &'static str, value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age_secs))
        .finish()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path("/").finish();
    cookie.make_removal();
    cookie
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found().insert_header((LOCATION, location)).finish()
}

fn redirect_to_entry(reason: &str) -> HttpResponse {
    redirect(&format!("{}?error={}", ENTRY_PATH, urlencoding::encode(reason)))
}

pub fn is_authenticated(req: &HttpRequest) -> bool {
    req.cookie(REFRESH_TOKEN_COOKIE).map_or(false, |c| !c.value().is_empty())
}

/// GET /api/auth/google
pub async fn google_auth(state: web::Data<AppState>) -> HttpResponse {
    let oauth_state = generate_random_string(32);
    match state.identity.authorization_url(&oauth_state) {
        Ok(url) => {
            info!("Redirecting to Google consent screen");
            HttpResponse::Found()
                .insert_header((LOCATION, url))
                .cookie(session_cookie(
                    OAUTH_STATE_COOKIE,
                    oauth_state,
                    OAUTH_STATE_MAX_AGE_SECS,
                    state.settings.server.secure_cookies,
                ))
                .finish()
        }
        Err(e) => {
            error!("Cannot start Google sign-in: {}", e);
            redirect_to_entry("oauth_not_configured")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /api/auth/callback
pub async fn google_callback(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<CallbackQuery>,
) -> HttpResponse {
    if let Some(err) = &query.error {
        warn!("Google sign-in was not completed: {}", err);
        return redirect_to_entry(err);
    }

    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        warn!("OAuth callback without an authorization code");
        return redirect_to_entry("missing_code");
    };

    let expected_state = req.cookie(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    if expected_state.is_none() || expected_state != query.state {
        warn!("{}", OAuthError::InvalidState);
        return redirect_to_entry("invalid_state");
    }

    match state.identity.exchange_code(code).await {
        Ok(tokens) => {
            let secure = state.settings.server.secure_cookies;
            info!("Google sign-in completed");
            HttpResponse::Found()
                .insert_header((LOCATION, PROTECTED_PATH))
                .cookie(session_cookie(ACCESS_TOKEN_COOKIE, tokens.access_token, ACCESS_TOKEN_MAX_AGE_SECS, secure))
                .cookie(session_cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token, REFRESH_TOKEN_MAX_AGE_SECS, secure))
                .cookie(removal_cookie(OAUTH_STATE_COOKIE))
                .finish()
        }
        Err(e) => {
            error!("Authorization code exchange failed: {}", e);
            redirect_to_entry("token_exchange_failed")
        }
    }
}

/// GET /api/auth/token
pub async fn session_token(req: HttpRequest) -> HttpResponse {
    let read = |name| req.cookie(name).map(|c| c.value().to_string()).filter(|v| !v.is_empty());
    HttpResponse::Ok().json(Credentials {
        access_token: read(ACCESS_TOKEN_COOKIE),
        refresh_token: read(REFRESH_TOKEN_COOKIE),
    })
}

/// POST /api/auth/logout
pub async fn logout() -> HttpResponse {
    debug!("Clearing session cookies");
    HttpResponse::Ok()
        .cookie(removal_cookie(ACCESS_TOKEN_COOKIE))
        .cookie(removal_cookie(REFRESH_TOKEN_COOKIE))
        .json(serde_json::json!({ "status": "signed_out" }))
}

/// Guard for the protected area: no session, back to the entry page.
pub async fn require_session(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, ActixError> {
    if is_authenticated(req.request()) {
        return next.call(req).await.map(ServiceResponse::map_into_left_body);
    }
    debug!("Unauthenticated request to {}, redirecting", req.path());
    Ok(req.into_response(redirect(ENTRY_PATH)).map_into_right_body())
}

/// Guard for the entry page: signed-in users go straight to the protected area.
pub async fn redirect_if_authenticated(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, ActixError> {
    if !is_authenticated(req.request()) {
        return next.call(req).await.map(ServiceResponse::map_into_left_body);
    }
    Ok(req.into_response(redirect(PROTECTED_PATH)).map_into_right_body())
}

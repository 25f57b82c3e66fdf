// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use actix_web::{error::JsonPayloadError, web, HttpRequest};
use actix_web_lab::middleware::from_fn as mw_from_fn;
use log::info;

use super::errors::ApiError;
use super::{auth, pages, query};

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    info!("Configuring routes (/, /dashboard, /api)");
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(
            web::resource(auth::ENTRY_PATH)
                .wrap(mw_from_fn(auth::redirect_if_authenticated))
                .route(web::get().to(pages::entry)),
        )
        .service(
            web::resource(auth::PROTECTED_PATH)
                .wrap(mw_from_fn(auth::require_session))
                .route(web::get().to(pages::dashboard)),
        )
        .service(
            web::scope("/api")
                .route("/health", web::get().to(pages::health))
                .route("/query", web::post().to(query::query))
                .service(
                    web::scope("/auth")
                        .route("/google", web::get().to(auth::google_auth))
                        .route("/callback", web::get().to(auth::google_callback))
                        .route("/token", web::get().to(auth::session_token))
                        .route("/logout", web::post().to(auth::logout)),
                ),
        );
}

// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use std::process::exit;
use std::sync::Arc;

use mailquery::api::{routes, AppState};
use mailquery::config::Settings;
use mailquery::services::ai::{GeminiAdapter, ReasoningGateway, RetryPolicy};
use mailquery::services::gmail::GmailClientFactory;
use mailquery::services::oauth_config::GoogleOAuthConfig;
use mailquery::services::oauth_service::GoogleOAuthService;

#[derive(Parser, Debug)]
#[command(version, about = "Answers natural-language questions about a Gmail inbox", long_about = None)]
struct Args {
    /// Path to a configuration file (toml, yaml or json)
    #[arg(short, long, env = "MAILQUERY_CONFIG")]
    config: Option<String>,

    /// Port to listen on; overrides server.port
    #[arg(short, long)]
    port: Option<u16>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut settings = Settings::new(args.config.as_deref()).unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {}", err);
        exit(1);
    });
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(settings.log.level.as_str())).init();

    if settings.gemini.api_key.is_empty() {
        warn!("GEMINI_API_KEY is not set; every reasoning call will fail");
    }

    let http_client = reqwest::Client::builder().build().unwrap_or_else(|err| {
        error!("Failed to build HTTP client: {}", err);
        exit(1);
    });

    let provider = Arc::new(GeminiAdapter::new(&settings.gemini, http_client.clone()));
    let gateway = Arc::new(ReasoningGateway::new(provider, RetryPolicy::from(&settings.retry)));
    let identity = Arc::new(GoogleOAuthService::new(
        GoogleOAuthConfig::from_settings(&settings),
        http_client.clone(),
    ));
    let mail_stores = Arc::new(GmailClientFactory::new(http_client));

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let state = web::Data::new(AppState {
        settings,
        identity,
        mail_stores,
        gateway,
    });

    info!("Starting server at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}

// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use config::{Environment, File};
use log::warn;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::agent::executor::DEFAULT_MAX_ITERATIONS;

/// How a question is turned into an answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryStrategy {
    /// Iterative decide/act loop.
    Agent,
    /// One-pass search, extract, answer.
    Pipeline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible base URL; the OAuth redirect URI is derived from it.
    pub public_url: String,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub max_iterations: usize,
    pub strategy: QueryStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_jitter_ms: u64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn max_jitter(&self) -> Duration {
        Duration::from_millis(self.max_jitter_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub google: GoogleConfig,
    pub gemini: GeminiConfig,
    pub agent: AgentConfig,
    pub retry: RetryConfig,
    pub log: LogConfig,
}

/// Environment variables that map straight onto a settings key.
const DIRECT_ENV_VARS: &[(&str, &str)] = &[
    ("SERVER_HOST", "server.host"),
    ("SERVER_PORT", "server.port"),
    ("PUBLIC_URL", "server.public_url"),
    ("SECURE_COOKIES", "server.secure_cookies"),
    ("GOOGLE_CLIENT_ID", "google.client_id"),
    ("GOOGLE_CLIENT_SECRET", "google.client_secret"),
    ("GEMINI_API_KEY", "gemini.api_key"),
    ("GEMINI_MODEL", "gemini.model"),
    ("GEMINI_BASE_URL", "gemini.base_url"),
    ("AGENT_MAX_ITERATIONS", "agent.max_iterations"),
    ("AGENT_STRATEGY", "agent.strategy"),
    ("LOG_LEVEL", "log.level"),
];

impl Settings {
    pub fn new(config_path: Option<&str>) -> Result<Self, SettingsError> {
        let mut config_builder = config::Config::builder()
            // Server defaults
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.public_url", "http://localhost:3000")?
            .set_default("server.secure_cookies", true)?
            // Credentials must come from a file or the environment
            .set_default("google.client_id", "")?
            .set_default("google.client_secret", "")?
            .set_default("gemini.api_key", "")?
            .set_default("gemini.model", "gemini-2.0-flash")?
            .set_default("gemini.base_url", "https://generativelanguage.googleapis.com/v1beta")?
            .set_default("gemini.temperature", 0.2)?
            // Agent defaults
            .set_default("agent.max_iterations", DEFAULT_MAX_ITERATIONS as u64)?
            .set_default("agent.strategy", "agent")?
            // Backoff for an overloaded reasoning service
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.base_delay_ms", 1000)?
            .set_default("retry.max_delay_ms", 10000)?
            .set_default("retry.max_jitter_ms", 1000)?
            .set_default("log.level", "info")?;

        if let Some(path) = config_path {
            config_builder = config_builder.add_source(File::with_name(path));
        }

        // e.g. `MAILQUERY_SERVER__PORT=8080` overrides `server.port`
        config_builder = config_builder.add_source(
            Environment::with_prefix("MAILQUERY")
                .prefix_separator("_")
                .separator("__")
                .ignore_empty(true),
        );

        for (env_var, key) in DIRECT_ENV_VARS {
            let Ok(value) = env::var(env_var) else { continue };
            if value.is_empty() {
                continue;
            }
            match *env_var {
                "SERVER_PORT" => match value.parse::<u16>() {
                    Ok(port) => config_builder = config_builder.set_override(*key, port)?,
                    Err(_) => warn!("Invalid port value in {}: {}", env_var, value),
                },
                "AGENT_MAX_ITERATIONS" => match value.parse::<u64>() {
                    Ok(n) => config_builder = config_builder.set_override(*key, n)?,
                    Err(_) => warn!("Invalid iteration count in {}: {}", env_var, value),
                },
                "SECURE_COOKIES" => match value.parse::<bool>() {
                    Ok(flag) => config_builder = config_builder.set_override(*key, flag)?,
                    Err(_) => warn!("Invalid boolean value in {}: {}", env_var, value),
                },
                _ => config_builder = config_builder.set_override(*key, value)?,
            }
        }

        let settings: Settings = config_builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.agent.max_iterations == 0 {
            return Err(SettingsError::Invalid("agent.max_iterations must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(SettingsError::Invalid("retry.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }

    /// The OAuth redirect URI registered with Google.
    pub fn redirect_uri(&self) -> String {
        format!("{}/api/auth/callback", self.server.public_url.trim_end_matches('/'))
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load or parse configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

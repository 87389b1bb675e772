use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base address of the streaming orchestrator. http(s) or ws(s).
    pub orchestrator_url: String,
    /// Path of the orchestrator's streaming endpoint.
    pub orchestrator_ws_path: String,
    /// Base address of the backend API behind the pass-through routes.
    pub backend_api_url: String,
    /// Overall deadline for one relay call (connect + exchange).
    pub relay_timeout: Duration,
    pub page_id_prefix: String,
    pub port: u16,
    pub rust_log: String,
}

pub const DEFAULT_WS_PATH: &str = "/ws/chat";
pub const DEFAULT_RELAY_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_PAGE_ID_PREFIX: &str = "extension_generate_";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            orchestrator_url: require_env("ORCHESTRATOR_URL")?,
            orchestrator_ws_path: std::env::var("ORCHESTRATOR_WS_PATH")
                .unwrap_or_else(|_| DEFAULT_WS_PATH.to_string()),
            backend_api_url: require_env("BACKEND_API_URL")?,
            relay_timeout: Duration::from_secs(
                std::env::var("RELAY_TIMEOUT_SECS")
                    .unwrap_or_else(|_| DEFAULT_RELAY_TIMEOUT_SECS.to_string())
                    .parse::<u64>()
                    .context("RELAY_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            page_id_prefix: std::env::var("PAGE_ID_PREFIX")
                .unwrap_or_else(|_| DEFAULT_PAGE_ID_PREFIX.to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
impl Config {
    /// Config pointing at local addresses, with defaults for everything optional.
    pub fn for_tests() -> Self {
        Config {
            orchestrator_url: "http://orchestrator.test".to_string(),
            orchestrator_ws_path: DEFAULT_WS_PATH.to_string(),
            backend_api_url: "http://backend.test".to_string(),
            relay_timeout: Duration::from_secs(DEFAULT_RELAY_TIMEOUT_SECS),
            page_id_prefix: DEFAULT_PAGE_ID_PREFIX.to_string(),
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}

//! Client configuration from environment variables

use std::path::PathBuf;
use std::time::Duration;

use super::error::{AppError, Result};

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Runtime configuration for the client core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// REST/SSE base URL, no trailing slash
    pub api_base_url: String,
    /// JSON file backing durable storage
    pub storage_path: PathBuf,
    /// Per-request HTTP timeout (SSE streams are exempt)
    pub http_timeout: Duration,
    /// Fixed delay before a dropped WebSocket reconnects
    pub ws_reconnect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            storage_path: PathBuf::from(".joyner/storage.json"),
            http_timeout: Duration::from_secs(10),
            ws_reconnect_delay: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// - `JOYNER_API_URL` (default `http://127.0.0.1:8000`)
    /// - `JOYNER_STORAGE_PATH` (default `.joyner/storage.json`)
    /// - `JOYNER_HTTP_TIMEOUT_SECS` (default 10)
    /// - `JOYNER_WS_RECONNECT_SECS` (default 5)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let api_base_url = std::env::var("JOYNER_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "JOYNER_API_URL must start with http:// or https://, got {}",
                api_base_url
            )));
        }

        Ok(Self {
            api_base_url,
            storage_path: std::env::var("JOYNER_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),
            http_timeout: secs_from_env("JOYNER_HTTP_TIMEOUT_SECS")?
                .unwrap_or(defaults.http_timeout),
            ws_reconnect_delay: secs_from_env("JOYNER_WS_RECONNECT_SECS")?
                .unwrap_or(defaults.ws_reconnect_delay),
        })
    }

    /// WebSocket endpoint for a user, derived from the API base URL
    pub fn ws_url(&self, user_id: &str) -> String {
        let base = self
            .api_base_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!("{}/ws/{}", base, user_id)
    }
}

fn secs_from_env(key: &str) -> Result<Option<Duration>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|e| AppError::Config(format!("{} must be a number of seconds: {}", key, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url_plain() {
        let config = ClientConfig::default();
        assert_eq!(config.ws_url("u1"), "ws://127.0.0.1:8000/ws/u1");
    }

    #[test]
    fn test_ws_url_tls() {
        let config = ClientConfig {
            api_base_url: "https://api.joyner.app".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(config.ws_url("abc"), "wss://api.joyner.app/ws/abc");
    }

    #[test]
    fn test_default_reconnect_delay_is_five_seconds() {
        assert_eq!(ClientConfig::default().ws_reconnect_delay, Duration::from_secs(5));
    }
}

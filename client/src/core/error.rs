//! # Common Error Types
//!
//! Consolidated error handling for the JOYNER client core.
//!
//! ## Error Categories
//!
//! - **Api**: transport failures (connection refused, timeout, DNS)
//! - **Http**: non-2xx responses, with the backend's `detail` string
//! - **Unauthorized**: no bearer token in durable storage
//! - **Parse**: malformed JSON from REST, SSE or WebSocket
//! - **Storage**: durable key-value storage failures
//! - **WebSocket**: socket connect/send failures
//! - **Tutorial**: invalid tutorial script or navigation target
//! - **Config**: invalid environment configuration
//!
//! Stores never propagate these to their callers: a failed fetch is logged
//! and the previous data stays visible. REST functions and the WebSocket
//! service return them so callers can surface a message.

use thiserror::Error;

/// Application-wide error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    /// Transport-level failure talking to the backend.
    #[error("API error: {0}")]
    Api(String),

    /// Backend answered with a non-success status.
    ///
    /// ```rust
    /// use joyner::core::error::AppError;
    ///
    /// let err = AppError::Http { status: 404, detail: "Friend not found".to_string() };
    /// assert_eq!(err.to_string(), "HTTP 404: Friend not found");
    /// ```
    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    /// No auth token is stored.
    #[error("Not logged in")]
    Unauthorized,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Tutorial error: {0}")]
    Tutorial(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl AppError {
    /// Whether the backend rejected the bearer token
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, AppError::Unauthorized | AppError::Http { status: 401, .. })
    }
}

/// Convenience type alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Parse(err.to_string())
        } else {
            AppError::Api(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for AppError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        AppError::WebSocket(err.to_string())
    }
}

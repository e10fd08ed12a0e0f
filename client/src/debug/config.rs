//! Logging configuration from environment variables

use std::path::PathBuf;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct DebugConfig {
    /// Log directory (daily rotation happens inside it)
    pub log_dir: PathBuf,
    /// File name prefix for the rotating log
    pub log_file_name: String,
    /// Log level filter (e.g., "joyner=debug,info")
    pub log_level: String,
    /// Mirror logs to stderr
    pub log_to_stderr: bool,
    /// Emit JSON lines instead of plain text
    pub json: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            log_file_name: "joyner.log".to_string(),
            log_level: "joyner=info,warn".to_string(),
            log_to_stderr: cfg!(feature = "debug-mode"),
            json: false,
        }
    }
}

impl DebugConfig {
    /// Load configuration from environment variables
    ///
    /// - `JOYNER_LOG_DIR`: log directory (default `logs`)
    /// - `RUST_LOG`: filter (default `joyner=info,warn`)
    /// - `JOYNER_LOG_STDERR`: `1` to mirror to stderr
    /// - `JOYNER_LOG_JSON`: `1` for JSON lines
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_dir: std::env::var("JOYNER_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            log_file_name: defaults.log_file_name,
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_to_stderr: std::env::var("JOYNER_LOG_STDERR")
                .map(|v| v == "1")
                .unwrap_or(defaults.log_to_stderr),
            json: std::env::var("JOYNER_LOG_JSON")
                .map(|v| v == "1")
                .unwrap_or(false),
        }
    }

    /// Full path of today's log file prefix
    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(&self.log_file_name)
    }

    /// Check if debug logging is enabled
    pub fn is_debug_enabled(&self) -> bool {
        self.log_level.contains("debug") || self.log_level.contains("trace")
    }
}

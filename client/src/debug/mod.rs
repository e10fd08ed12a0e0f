//! # Logging and Task Tracking
//!
//! - **File-based logging**: structured logs to `logs/joyner.log.<date>` (daily rotation)
//! - **Async task tracking**: `spawn_tracked` logs task lifecycle and keeps an active count
//!
//! ## Usage
//!
//! ```rust,no_run
//! // Initialize at app startup
//! joyner::debug::init();
//!
//! // Log with structured fields
//! tracing::info!(endpoint = "/friends/list", duration_ms = 234, "API call completed");
//! ```
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (e.g., `joyner=debug,info`)
//! - `JOYNER_LOG_DIR`: Log directory (default: `logs`)
//! - `JOYNER_LOG_STDERR`: Mirror logs to stderr (1=on)
//! - `JOYNER_LOG_JSON`: JSON lines output (1=on)

pub mod config;
pub mod logger;
pub mod task_tracker;

pub use config::DebugConfig;
pub use logger::{init as init_logger, init_with as init_logger_with};
pub use task_tracker::{active_task_count, spawn_tracked};

/// Initialize the logging system. Call once at startup.
pub fn init() {
    init_logger();
}

//! File-based logging initialization

use super::config::DebugConfig;
use once_cell::sync::OnceCell;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Keeps the non-blocking writer flushing for the lifetime of the program
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initialize the logging system
///
/// Sets up:
/// - Daily log rotation under `config.log_dir`
/// - Non-blocking writes so logging never stalls the runtime
/// - Optional stderr mirror and JSON output
///
/// Calling this more than once keeps the first subscriber.
pub fn init() {
    init_with(&DebugConfig::from_env());
}

/// Initialize logging from an explicit configuration
pub fn init_with(config: &DebugConfig) {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("joyner=info,warn"));

    let file_layer = match fs::create_dir_all(&config.log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(&config.log_dir, &config.log_file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);

            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false);
            Some(if config.json { layer.json().boxed() } else { layer.boxed() })
        }
        Err(e) => {
            eprintln!("Warning: Failed to create log directory: {}", e);
            None
        }
    };

    let stderr_layer = config.log_to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact()
            .boxed()
    });

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            log_file = %config.log_file().display(),
            log_level = %config.log_level,
            stderr = config.log_to_stderr,
            json = config.json,
            "Logging initialized"
        );
    }
}

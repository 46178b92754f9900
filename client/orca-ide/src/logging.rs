//! Logging setup with file rotation.

use orca_config::Config;

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

const LOG_FILE_PREFIX: &str = "orca-ide";

/// Setup logging with console and rotating file output.
///
/// # Log Layers
/// - Console: Human-readable, colored output on stderr
/// - File: plain text, daily rotation, `logging.retention_days` files kept
pub fn setup_logging(config: &Config) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let logs_dir = config.log_dir()?;
    std::fs::create_dir_all(&logs_dir)?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(true)
        .with_writer(std::io::stderr);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(config.logging.retention_days)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(&logs_dir)?;

    let file_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config)));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(logs_dir)
}

/// Filter used when `RUST_LOG` is unset.
pub(crate) fn default_directives(config: &Config) -> String {
    format!("{},orca::server=info,orca::notice=debug", config.logging.level)
}

/// Get path to current log file (for diagnostics).
pub fn current_log_path(logs_dir: &Path) -> PathBuf {
    let today = chrono::Local::now().format("%Y-%m-%d");
    logs_dir.join(format!("{LOG_FILE_PREFIX}.{today}.log"))
}

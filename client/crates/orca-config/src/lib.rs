mod config;
mod error;
mod health_config;
mod log_level;
mod log_stream_config;
mod logging_config;
mod server_config;
mod shutdown_config;

pub use config::Config;
pub use error::{ConfigError, ConfigErrorResult};
pub use health_config::HealthConfig;
pub use log_level::LogLevel;
pub use log_stream_config::LogStreamConfig;
pub use logging_config::LoggingConfig;
pub use server_config::ServerConfig;
pub use shutdown_config::ShutdownConfig;

#[cfg(test)]
mod tests;

pub const CONFIG_DIR_ENV: &str = "ORCA_CONFIG_DIR";
pub const CONFIG_FILENAME: &str = "config.toml";
const DEFAULT_CONFIG_DIR: &str = ".orca";

// Server
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_COMMAND: &str = "orca";
const DEFAULT_SERVER_SUBCOMMAND: &str = "server";

// Health polling
pub const MIN_HEALTH_INTERVAL_MS: u64 = 10;
pub const MAX_HEALTH_INTERVAL_MS: u64 = 60_000;
const DEFAULT_HEALTH_INTERVAL_MS: u64 = 1000;
pub const MIN_HEALTH_ATTEMPTS: u32 = 1;
pub const MAX_HEALTH_ATTEMPTS: u32 = 600;
const DEFAULT_HEALTH_ATTEMPTS: u32 = 10;
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5000;

// Log stream
const LOGGING_PATH: &str = "/logging";
pub const MAX_RECONNECTION_ATTEMPTS: u32 = 50;
const DEFAULT_RECONNECTION_ATTEMPTS: u32 = 5;
const DEFAULT_RECONNECTION_DELAY_MS: u64 = 2000;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

// Shutdown
pub const MIN_CONFIRMATION_TIMEOUT_MS: u64 = 100;
pub const MAX_CONFIRMATION_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_CONFIRMATION_TIMEOUT_MS: u64 = 3000;
const DEFAULT_CONFIRMATION_MARKER: &str = "Shutdown request";
pub const MIN_SHUTDOWN_REQUEST_TIMEOUT_MS: u64 = 100;
pub const MAX_SHUTDOWN_REQUEST_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_SHUTDOWN_REQUEST_TIMEOUT_MS: u64 = 5000;

// Logging
const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
const DEFAULT_LOG_DIRECTORY: &str = "logs";
const DEFAULT_LOG_RETENTION_DAYS: usize = 7;

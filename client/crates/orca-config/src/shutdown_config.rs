use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_CONFIRMATION_MARKER, DEFAULT_CONFIRMATION_TIMEOUT_MS,
    DEFAULT_SHUTDOWN_REQUEST_TIMEOUT_MS, MAX_CONFIRMATION_TIMEOUT_MS,
    MAX_SHUTDOWN_REQUEST_TIMEOUT_MS, MIN_CONFIRMATION_TIMEOUT_MS, MIN_SHUTDOWN_REQUEST_TIMEOUT_MS,
};

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long to wait for the server to confirm a shutdown request
    pub confirmation_timeout_ms: u64,
    /// Substring of the server log line that confirms shutdown
    pub confirmation_marker: String,
    /// Upper bound on the shutdown request itself, body included
    pub request_timeout_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_ms: DEFAULT_CONFIRMATION_TIMEOUT_MS,
            confirmation_marker: String::from(DEFAULT_CONFIRMATION_MARKER),
            request_timeout_ms: DEFAULT_SHUTDOWN_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ShutdownConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.confirmation_timeout_ms < MIN_CONFIRMATION_TIMEOUT_MS
            || self.confirmation_timeout_ms > MAX_CONFIRMATION_TIMEOUT_MS
        {
            return Err(ConfigError::shutdown(format!(
                "shutdown.confirmation_timeout_ms must be {}-{}, got {}",
                MIN_CONFIRMATION_TIMEOUT_MS,
                MAX_CONFIRMATION_TIMEOUT_MS,
                self.confirmation_timeout_ms
            )));
        }

        if self.request_timeout_ms < MIN_SHUTDOWN_REQUEST_TIMEOUT_MS
            || self.request_timeout_ms > MAX_SHUTDOWN_REQUEST_TIMEOUT_MS
        {
            return Err(ConfigError::shutdown(format!(
                "shutdown.request_timeout_ms must be {}-{}, got {}",
                MIN_SHUTDOWN_REQUEST_TIMEOUT_MS,
                MAX_SHUTDOWN_REQUEST_TIMEOUT_MS,
                self.request_timeout_ms
            )));
        }

        if self.confirmation_marker.is_empty() {
            return Err(ConfigError::shutdown(
                "shutdown.confirmation_marker cannot be empty",
            ));
        }

        Ok(())
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

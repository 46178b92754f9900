use crate::server_config::is_http_url;
use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_RECONNECTION_ATTEMPTS,
    DEFAULT_RECONNECTION_DELAY_MS, LOGGING_PATH, MAX_RECONNECTION_ATTEMPTS,
};

use std::time::Duration;

use serde::Deserialize;

/// Settings for the server log event stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogStreamConfig {
    /// Explicit stream endpoint. Defaults to `{server.base_url}/logging`.
    pub endpoint: Option<String>,
    /// Automatic reconnection attempts made by the transport
    pub reconnection_attempts: u32,
    /// Fixed delay between reconnection attempts in milliseconds
    pub reconnection_delay_ms: u64,
    /// Timeout of a single connect request in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for LogStreamConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            reconnection_attempts: DEFAULT_RECONNECTION_ATTEMPTS,
            reconnection_delay_ms: DEFAULT_RECONNECTION_DELAY_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl LogStreamConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if let Some(endpoint) = &self.endpoint
            && !is_http_url(endpoint)
        {
            return Err(ConfigError::log_stream(format!(
                "log_stream.endpoint must start with http:// or https://, got '{endpoint}'"
            )));
        }

        if self.reconnection_attempts > MAX_RECONNECTION_ATTEMPTS {
            return Err(ConfigError::log_stream(format!(
                "log_stream.reconnection_attempts must be <= {}, got {}",
                MAX_RECONNECTION_ATTEMPTS, self.reconnection_attempts
            )));
        }

        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::log_stream(
                "log_stream.connect_timeout_ms must be > 0",
            ));
        }

        Ok(())
    }

    /// Stream endpoint, derived from the server base URL unless set explicitly.
    pub fn endpoint(&self, base_url: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("{}{}", base_url.trim_end_matches('/'), LOGGING_PATH),
        }
    }

    pub fn reconnection_delay(&self) -> Duration {
        Duration::from_millis(self.reconnection_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

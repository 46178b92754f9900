use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_HEALTH_ATTEMPTS, DEFAULT_HEALTH_INTERVAL_MS,
    DEFAULT_PROBE_TIMEOUT_MS, MAX_HEALTH_ATTEMPTS, MAX_HEALTH_INTERVAL_MS, MIN_HEALTH_ATTEMPTS,
    MIN_HEALTH_INTERVAL_MS,
};

use std::time::Duration;

use serde::Deserialize;

/// Readiness polling budget used after launching the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Delay before each probe in milliseconds
    pub interval_ms: u64,
    /// Number of probes before giving up
    pub max_attempts: u32,
    /// Timeout of a single probe request in milliseconds
    pub probe_timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_HEALTH_INTERVAL_MS,
            max_attempts: DEFAULT_HEALTH_ATTEMPTS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
        }
    }
}

impl HealthConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.interval_ms < MIN_HEALTH_INTERVAL_MS || self.interval_ms > MAX_HEALTH_INTERVAL_MS {
            return Err(ConfigError::health(format!(
                "health.interval_ms must be {}-{}, got {}",
                MIN_HEALTH_INTERVAL_MS, MAX_HEALTH_INTERVAL_MS, self.interval_ms
            )));
        }

        if self.max_attempts < MIN_HEALTH_ATTEMPTS || self.max_attempts > MAX_HEALTH_ATTEMPTS {
            return Err(ConfigError::health(format!(
                "health.max_attempts must be {}-{}, got {}",
                MIN_HEALTH_ATTEMPTS, MAX_HEALTH_ATTEMPTS, self.max_attempts
            )));
        }

        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::health("health.probe_timeout_ms must be > 0"));
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

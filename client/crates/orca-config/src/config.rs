use crate::{
    CONFIG_DIR_ENV, CONFIG_FILENAME, ConfigError, ConfigErrorResult, DEFAULT_CONFIG_DIR,
    HealthConfig, LogStreamConfig, LoggingConfig, ServerConfig, ShutdownConfig,
};

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub health: HealthConfig,
    pub log_stream: LogStreamConfig,
    pub shutdown: ShutdownConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from the config directory.
    ///
    /// Loading order:
    /// 1. ORCA_CONFIG_DIR env var, else ./.orca/
    /// 2. config.toml if it exists, else defaults
    /// 3. ORCA_* environment variable overrides
    ///
    /// Does NOT validate - call validate() after load().
    pub fn load() -> ConfigErrorResult<Self> {
        let config_path = Self::config_dir()?.join(CONFIG_FILENAME);
        Self::load_from(&config_path)
    }

    /// Load config from an explicit file path, then apply env overrides.
    pub fn load_from(path: &Path) -> ConfigErrorResult<Self> {
        let mut config = if path.exists() {
            Self::load_toml(path)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    fn load_toml(path: &Path) -> ConfigErrorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the config directory.
    /// Priority: ORCA_CONFIG_DIR env var > ./.orca/ (relative to cwd)
    pub fn config_dir() -> ConfigErrorResult<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        let cwd = std::env::current_dir()
            .map_err(|_| ConfigError::config("Cannot determine current working directory"))?;
        Ok(cwd.join(DEFAULT_CONFIG_DIR))
    }

    /// Validate all sections.
    pub fn validate(&self) -> ConfigErrorResult<()> {
        self.server.validate()?;
        self.health.validate()?;
        self.log_stream.validate()?;
        self.shutdown.validate()?;

        if self.logging.retention_days == 0 {
            return Err(ConfigError::config("logging.retention_days must be > 0"));
        }

        Ok(())
    }

    /// Resolved log stream endpoint.
    pub fn log_stream_endpoint(&self) -> String {
        self.log_stream.endpoint(self.server.base_url())
    }

    /// Absolute log directory (relative entries resolve against the config dir).
    pub fn log_dir(&self) -> ConfigErrorResult<PathBuf> {
        let dir = Path::new(&self.logging.dir);
        if dir.is_absolute() {
            return Ok(dir.to_path_buf());
        }
        Ok(Self::config_dir()?.join(dir))
    }

    pub fn log_summary(&self) {
        info!("Configuration loaded:");
        info!(
            "  server: {} (command: {} {})",
            self.server.base_url(),
            self.server.resolve_command(),
            self.server.args.join(" ")
        );
        info!(
            "  health: {} attempts every {}ms (probe timeout {}ms)",
            self.health.max_attempts, self.health.interval_ms, self.health.probe_timeout_ms
        );
        info!(
            "  log_stream: {} (reconnect {}x every {}ms)",
            self.log_stream_endpoint(),
            self.log_stream.reconnection_attempts,
            self.log_stream.reconnection_delay_ms
        );
        info!(
            "  shutdown: request within {}ms, confirm '{}' within {}ms",
            self.shutdown.request_timeout_ms,
            self.shutdown.confirmation_marker,
            self.shutdown.confirmation_timeout_ms
        );
        info!(
            "  logging: {} in {} ({} days)",
            self.logging.level, self.logging.dir, self.logging.retention_days
        );
    }

    fn apply_env_overrides(&mut self) {
        // Server
        Self::apply_env_string("ORCA_URL", &mut self.server.base_url);
        Self::apply_env_option_string("ORCA_PATH", &mut self.server.command);
        Self::apply_env_option_string("ORCA_PYTHON", &mut self.server.python_interpreter);

        // Health
        Self::apply_env_parse("ORCA_HEALTH_INTERVAL_MS", &mut self.health.interval_ms);
        Self::apply_env_parse("ORCA_HEALTH_MAX_ATTEMPTS", &mut self.health.max_attempts);
        Self::apply_env_parse(
            "ORCA_HEALTH_PROBE_TIMEOUT_MS",
            &mut self.health.probe_timeout_ms,
        );

        // Log stream
        Self::apply_env_option_string("ORCA_LOGGING_URL", &mut self.log_stream.endpoint);
        Self::apply_env_parse(
            "ORCA_LOGGING_RECONNECTION_ATTEMPTS",
            &mut self.log_stream.reconnection_attempts,
        );
        Self::apply_env_parse(
            "ORCA_LOGGING_RECONNECTION_DELAY_MS",
            &mut self.log_stream.reconnection_delay_ms,
        );

        // Shutdown
        Self::apply_env_parse(
            "ORCA_SHUTDOWN_TIMEOUT_MS",
            &mut self.shutdown.confirmation_timeout_ms,
        );
        Self::apply_env_parse(
            "ORCA_SHUTDOWN_REQUEST_TIMEOUT_MS",
            &mut self.shutdown.request_timeout_ms,
        );
        Self::apply_env_string(
            "ORCA_SHUTDOWN_MARKER",
            &mut self.shutdown.confirmation_marker,
        );

        // Logging
        Self::apply_env_parse("ORCA_LOG_LEVEL", &mut self.logging.level);
        Self::apply_env_string("ORCA_LOG_DIR", &mut self.logging.dir);
    }

    fn apply_env_string(var_name: &str, target: &mut String) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val;
        }
    }

    fn apply_env_parse<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(val) = std::env::var(var_name)
            && let Ok(parsed) = val.parse()
        {
            *target = parsed;
        }
    }

    fn apply_env_option_string(var_name: &str, target: &mut Option<String>) {
        if let Ok(val) = std::env::var(var_name) {
            *target = Some(val);
        }
    }
}

use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_BASE_URL, DEFAULT_COMMAND, DEFAULT_SERVER_SUBCOMMAND,
};

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Where the Orca server lives and how to launch it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the HTTP API (health, shutdown, REST)
    pub base_url: String,
    /// Executable to launch. Falls back to the interpreter-derived path, then `orca`.
    pub command: Option<String>,
    /// Arguments passed to the executable
    pub args: Vec<String>,
    /// Python interpreter whose environment contains the `orca` entry point
    pub python_interpreter: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            command: None,
            args: vec![String::from(DEFAULT_SERVER_SUBCOMMAND)],
            python_interpreter: None,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if !is_http_url(&self.base_url) {
            return Err(ConfigError::server(format!(
                "server.base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }

        if let Some(command) = &self.command
            && command.trim().is_empty()
        {
            return Err(ConfigError::server("server.command cannot be empty"));
        }

        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Executable used to launch the server.
    ///
    /// Resolution order:
    /// 1. `server.command` (also set by `ORCA_PATH`)
    /// 2. `orca` inside the configured Python interpreter's environment, if present
    /// 3. `orca` on PATH
    pub fn resolve_command(&self) -> String {
        if let Some(command) = &self.command {
            return command.clone();
        }

        if let Some(interpreter) = &self.python_interpreter
            && let Some(executable) = environment_executable(Path::new(interpreter))
            && executable.exists()
        {
            return executable.to_string_lossy().into_owned();
        }

        String::from(DEFAULT_COMMAND)
    }
}

/// `<env>/bin/orca` (or `<env>\Scripts\orca.exe`) for an interpreter at `<env>/bin/python`.
pub(crate) fn environment_executable(interpreter: &Path) -> Option<PathBuf> {
    let env_dir = interpreter.parent()?.parent()?;

    if cfg!(windows) {
        Some(env_dir.join("Scripts").join("orca.exe"))
    } else {
        Some(env_dir.join("bin").join(DEFAULT_COMMAND))
    }
}

pub(crate) fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"));

    matches!(rest, Some(host) if !host.is_empty())
}

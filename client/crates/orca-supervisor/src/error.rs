use std::panic::Location;

use error_location::ErrorLocation;
use orca_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to launch '{command}': {source} {location}")]
    LaunchFailure {
        command: String,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Orca server unreachable after {attempts} attempts {location}")]
    UnreachableTimeout {
        attempts: u32,
        location: ErrorLocation,
    },

    #[error("Configuration invalid: {source} {location}")]
    ConfigInvalid {
        #[source]
        source: ConfigError,
        location: ErrorLocation,
    },

    #[error("Log stream endpoint invalid: {message} {location}")]
    StreamEndpoint {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO error: {source} {location}")]
    Io {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("HTTP error: {source} {location}")]
    Http {
        #[source]
        source: reqwest::Error,
        location: ErrorLocation,
    },
}

impl SupervisorError {
    /// Whether retrying the same operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::UnreachableTimeout { .. } | Self::Http { .. })
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::LaunchFailure { .. } => {
                "The Orca executable could not be started. \
                   Install Orca or set ORCA_PATH to its location."
            }
            Self::UnreachableTimeout { .. } => {
                "The Orca server did not answer in time. \
                   Check the server log or raise health.max_attempts."
            }
            Self::ConfigInvalid { .. } => {
                "Configuration file has invalid settings. \
                   Fix the reported value or delete the config file to use defaults."
            }
            Self::StreamEndpoint { .. } => {
                "The log stream URL is malformed. \
                   Check log_stream.endpoint or ORCA_LOGGING_URL."
            }
            _ => "An unexpected error occurred. Please check the logs for details.",
        }
    }
}

impl From<std::io::Error> for SupervisorError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for SupervisorError {
    #[track_caller]
    fn from(source: reqwest::Error) -> Self {
        Self::Http {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for SupervisorError {
    #[track_caller]
    fn from(source: ConfigError) -> Self {
        Self::ConfigInvalid {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;

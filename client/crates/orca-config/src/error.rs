use std::panic::Location;
use std::path::PathBuf;
use std::result::Result as StdResult;

use error_location::ErrorLocation;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ConfigError {
    #[error("{category} error: {message} {location}")]
    Generic {
        category: &'static str,
        message: String,
        location: ErrorLocation,
    },

    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    /// Create a config error
    #[track_caller]
    pub fn config<S: Into<String>>(message: S) -> Self {
        ConfigError::Generic {
            category: "Config",
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Create a server section error
    #[track_caller]
    pub fn server<S: Into<String>>(message: S) -> Self {
        ConfigError::Generic {
            category: "Server",
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Create a health section error
    #[track_caller]
    pub fn health<S: Into<String>>(message: S) -> Self {
        ConfigError::Generic {
            category: "Health",
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Create a log stream section error
    #[track_caller]
    pub fn log_stream<S: Into<String>>(message: S) -> Self {
        ConfigError::Generic {
            category: "LogStream",
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Create a shutdown section error
    #[track_caller]
    pub fn shutdown<S: Into<String>>(message: S) -> Self {
        ConfigError::Generic {
            category: "Shutdown",
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type ConfigErrorResult<T> = StdResult<T, ConfigError>;

mod config;
mod health;

use std::env;

use tempfile::TempDir;

const OVERRIDE_VARS: &[&str] = &[
    "ORCA_URL",
    "ORCA_PATH",
    "ORCA_PYTHON",
    "ORCA_HEALTH_INTERVAL_MS",
    "ORCA_HEALTH_MAX_ATTEMPTS",
    "ORCA_HEALTH_PROBE_TIMEOUT_MS",
    "ORCA_LOGGING_URL",
    "ORCA_LOGGING_RECONNECTION_ATTEMPTS",
    "ORCA_LOGGING_RECONNECTION_DELAY_MS",
    "ORCA_SHUTDOWN_TIMEOUT_MS",
    "ORCA_SHUTDOWN_REQUEST_TIMEOUT_MS",
    "ORCA_SHUTDOWN_MARKER",
    "ORCA_LOG_LEVEL",
    "ORCA_LOG_DIR",
];

/// RAII guard for environment variables - automatically restores on drop
pub(crate) struct EnvGuard {
    key: &'static str,
    original: Option<String>,
}

impl EnvGuard {
    pub(crate) fn set(key: &'static str, value: &str) -> Self {
        unsafe {
            let original = env::var(key).ok();
            env::set_var(key, value);
            Self { key, original }
        }
    }

    pub(crate) fn remove(key: &'static str) -> Self {
        unsafe {
            let original = env::var(key).ok();
            env::remove_var(key);
            Self { key, original }
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        unsafe {
            match &self.original {
                Some(val) => env::set_var(self.key, val),
                None => env::remove_var(self.key),
            }
        }
    }
}

/// Temp config directory with ORCA_CONFIG_DIR pointing at it and no ORCA_* overrides set.
pub(crate) struct ConfigDir {
    pub(crate) temp: TempDir,
    _dir: EnvGuard,
    _cleared: Vec<EnvGuard>,
}

impl ConfigDir {
    pub(crate) fn write(&self, contents: &str) {
        std::fs::write(self.temp.path().join(crate::CONFIG_FILENAME), contents).unwrap();
    }
}

pub(crate) fn setup_config_dir() -> ConfigDir {
    let temp = TempDir::new().unwrap();
    let dir = EnvGuard::set(crate::CONFIG_DIR_ENV, temp.path().to_str().unwrap());
    let cleared = OVERRIDE_VARS.iter().map(|var| EnvGuard::remove(*var)).collect();
    ConfigDir {
        temp,
        _dir: dir,
        _cleared: cleared,
    }
}

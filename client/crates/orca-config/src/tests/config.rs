use crate::tests::{EnvGuard, setup_config_dir};
use crate::{Config, LogLevel};

use googletest::assert_that;
use googletest::prelude::{anything, contains_substring, eq, err, ok};
use serial_test::serial;

// =========================================================================
// Loading
// =========================================================================

#[test]
#[serial]
fn given_no_config_file_when_load_then_defaults_used() {
    // Given
    let _dir = setup_config_dir();

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.server.base_url(), eq("http://127.0.0.1:5000"));
    assert_that!(config.server.args, eq(&vec![String::from("server")]));
    assert_that!(config.health.max_attempts, eq(10));
    assert_that!(config.shutdown.confirmation_timeout_ms, eq(3000));
    assert_that!(
        config.log_stream_endpoint(),
        eq("http://127.0.0.1:5000/logging")
    );
}

#[test]
#[serial]
fn given_defaults_when_validate_then_ok() {
    // Given
    let _dir = setup_config_dir();

    // When
    let result = Config::load().unwrap().validate();

    // Then
    assert_that!(result, ok(anything()));
}

#[test]
#[serial]
fn given_toml_file_when_load_then_file_values_used() {
    // Given
    let dir = setup_config_dir();
    dir.write(
        r#"
            [server]
            base_url = "http://localhost:6000/"
            command = "/opt/orca/bin/orca"

            [health]
            interval_ms = 250
            max_attempts = 4

            [shutdown]
            confirmation_marker = "bye"
        "#,
    );

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.server.base_url(), eq("http://localhost:6000"));
    assert_that!(config.server.resolve_command(), eq("/opt/orca/bin/orca"));
    assert_that!(config.health.interval_ms, eq(250));
    assert_that!(config.health.max_attempts, eq(4));
    assert_that!(config.shutdown.confirmation_marker, eq("bye"));
    assert_that!(
        config.log_stream_endpoint(),
        eq("http://localhost:6000/logging")
    );
}

#[test]
#[serial]
fn given_env_var_and_toml_when_load_then_env_var_wins() {
    // Given
    let dir = setup_config_dir();
    dir.write(
        r#"
            [server]
            command = "from-file"
        "#,
    );
    let _path = EnvGuard::set("ORCA_PATH", "from-env");
    let _level = EnvGuard::set("ORCA_LOG_LEVEL", "debug");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.server.resolve_command(), eq("from-env"));
    assert_that!(config.logging.level, eq(LogLevel(log::LevelFilter::Debug)));
}

#[test]
#[serial]
fn given_unparseable_numeric_env_var_when_load_then_value_ignored() {
    // Given
    let _dir = setup_config_dir();
    let _attempts = EnvGuard::set("ORCA_HEALTH_MAX_ATTEMPTS", "lots");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.health.max_attempts, eq(10));
}

#[test]
#[serial]
fn given_malformed_toml_when_load_then_error_mentions_file() {
    // Given
    let dir = setup_config_dir();
    dir.write("this is not valid toml {{{{");

    // When
    let result = Config::load();

    // Then
    assert_that!(result, err(anything()));
    let message = result.unwrap_err().to_string();
    assert_that!(message, contains_substring("config.toml"));
}

#[test]
#[serial]
fn given_unknown_log_level_when_load_then_falls_back_to_info() {
    // Given
    let dir = setup_config_dir();
    dir.write(
        r#"
            [logging]
            level = "chatty"
        "#,
    );

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.logging.level, eq(LogLevel(log::LevelFilter::Info)));
}

#[test]
#[serial]
fn given_relative_log_dir_when_log_dir_then_resolved_under_config_dir() {
    // Given
    let dir = setup_config_dir();

    // When
    let log_dir = Config::load().unwrap().log_dir().unwrap();

    // Then
    assert_that!(log_dir, eq(&dir.temp.path().join("logs")));
}

#[test]
#[serial]
fn given_zero_retention_when_validate_then_error() {
    // Given
    let dir = setup_config_dir();
    dir.write(
        r#"
            [logging]
            retention_days = 0
        "#,
    );

    // When
    let result = Config::load().unwrap().validate();

    // Then
    assert_that!(result, err(anything()));
}

use crate::{HealthConfig, MAX_HEALTH_ATTEMPTS, MIN_HEALTH_INTERVAL_MS};

use std::time::Duration;

use googletest::assert_that;
use googletest::prelude::{anything, eq, err, ok};

#[test]
fn given_defaults_when_validate_then_ok() {
    assert_that!(HealthConfig::default().validate(), ok(anything()));
}

#[test]
fn given_zero_attempts_when_validate_then_error() {
    let config = HealthConfig {
        max_attempts: 0,
        ..HealthConfig::default()
    };

    assert_that!(config.validate(), err(anything()));
}

#[test]
fn given_attempts_over_max_when_validate_then_error() {
    let config = HealthConfig {
        max_attempts: MAX_HEALTH_ATTEMPTS + 1,
        ..HealthConfig::default()
    };

    assert_that!(config.validate(), err(anything()));
}

#[test]
fn given_interval_below_min_when_validate_then_error() {
    let config = HealthConfig {
        interval_ms: MIN_HEALTH_INTERVAL_MS - 1,
        ..HealthConfig::default()
    };

    assert_that!(config.validate(), err(anything()));
}

#[test]
fn given_config_when_durations_then_milliseconds_converted() {
    let config = HealthConfig {
        interval_ms: 250,
        probe_timeout_ms: 1500,
        ..HealthConfig::default()
    };

    assert_that!(config.interval(), eq(Duration::from_millis(250)));
    assert_that!(config.probe_timeout(), eq(Duration::from_millis(1500)));
}

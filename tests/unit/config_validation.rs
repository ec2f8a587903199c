//! Unit tests for configuration validation.

use gantry_motion::config::parse_config;
use gantry_motion::error::{ConfigError, Error};

const AXIS_X: &str = r#"
[axes.x]
step_line = 5
dir_line = 6
enable_line = 13
steps_per_mm = 80.0
"#;

fn with_x(extra: &str) -> String {
    format!("{AXIS_X}\n{extra}")
}

/// Test validation of a valid configuration.
#[test]
fn test_valid_config_passes_validation() {
    let toml = with_x(
        r#"
[axes.x.sensor]
name = "x_home"
line = 20
"#,
    );
    assert!(parse_config(&toml).is_ok());
}

/// Zero or negative scale is rejected.
#[test]
fn test_invalid_steps_per_mm() {
    let toml = r#"
[axes.x]
step_line = 5
dir_line = 6
enable_line = 13
steps_per_mm = -80.0
"#;
    assert!(matches!(
        parse_config(toml),
        Err(Error::Config(ConfigError::InvalidStepsPerMm(_)))
    ));
}

/// A zero pulse width cannot be emitted.
#[test]
fn test_zero_pulse_width() {
    let toml = r#"
[axes.x]
step_line = 5
dir_line = 6
enable_line = 13
steps_per_mm = 80.0
pulse_width_us = 0
"#;
    assert_eq!(
        parse_config(toml).unwrap_err(),
        Error::Config(ConfigError::InvalidPulseWidth(0))
    );
}

/// The sensor may not share a line with the motor outputs.
#[test]
fn test_sensor_on_output_line() {
    let toml = with_x(
        r#"
[axes.x.sensor]
name = "x_home"
line = 13
"#,
    );
    assert!(matches!(
        parse_config(&toml),
        Err(Error::Config(ConfigError::DuplicateLine { .. }))
    ));
}

/// Filter parameters follow the same rules as runtime reconfiguration.
#[test]
fn test_invalid_filter_parameters() {
    for (field, value) in [
        ("debounce_ms", 0),
        ("filter_samples", 0),
        ("filter_samples", 33),
        ("interference_threshold", 0),
        ("interference_window_ms", 0),
    ] {
        let toml = with_x(&format!(
            r#"
[axes.x.sensor]
name = "x_home"
line = 20
{field} = {value}
"#
        ));
        assert!(parse_config(&toml).is_err(), "{field} = {value} should be rejected");
    }
}

/// Homing speeds and bounds must be positive, and verification must overtravel.
#[test]
fn test_invalid_homing_parameters() {
    for (line, field) in [
        ("approach_speed_mm_s = 0.0", "approach_speed_mm_s"),
        ("verify_speed_mm_s = -1.0", "verify_speed_mm_s"),
        ("verify_distance_mm = 0.0", "verify_distance_mm"),
        ("verify_overtravel = 0.9", "verify_overtravel"),
        ("max_travel_mm = 0.0", "max_travel_mm"),
        ("max_attempts = 0", "max_attempts"),
    ] {
        let toml = with_x(&format!("[homing]\n{line}\n"));
        assert_eq!(
            parse_config(&toml).unwrap_err(),
            Error::Config(ConfigError::InvalidHomingParameter(field))
        );
    }
}

/// Sensor names key the status map and must be unique.
#[test]
fn test_duplicate_sensor_names() {
    let toml = with_x(
        r#"
[axes.x.sensor]
name = "home"
line = 20

[axes.y]
step_line = 17
dir_line = 27
enable_line = 22
steps_per_mm = 80.0

[axes.y.sensor]
name = "home"
line = 21
"#,
    );
    assert!(matches!(
        parse_config(&toml),
        Err(Error::Config(ConfigError::DuplicateSensorName(_)))
    ));
}

/// An axis cannot follow itself.
#[test]
fn test_self_pairing() {
    let toml = with_x("[coordination]\npairs = [[\"x\", \"x\"]]\n");
    assert!(matches!(
        parse_config(&toml),
        Err(Error::Config(ConfigError::InvalidPairing { .. }))
    ));
}

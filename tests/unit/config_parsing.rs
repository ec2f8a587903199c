//! Unit tests for TOML configuration parsing.

use gantry_motion::config::{parse_config, GantryConfig};
use gantry_motion::hal::Line;
use gantry_motion::Direction;

const FULL_CONFIG: &str = r#"
[axes.x]
step_line = 5
dir_line = 6
enable_line = 13
steps_per_mm = 80.0
direction_inverted = true

[axes.x.sensor]
name = "x_home"
line = 20
debounce_ms = 50
filter_samples = 5

[axes.y1]
step_line = 17
dir_line = 27
enable_line = 22
steps_per_mm = 40.0
pulse_width_us = 10
enable_active_low = false

[axes.y1.sensor]
name = "y_home"
line = 21
active_low = false
interference_threshold = 4
interference_window_ms = 500

[axes.y2]
step_line = 23
dir_line = 24
enable_line = 25
steps_per_mm = 40.0

[homing]
approach_speed_mm_s = 20.0
verify_distance_mm = 3.0
home_direction_positive = true
max_attempts = 3

[coordination]
tick_delay_us = 100
pairs = [["y2", "y1"]]
"#;

fn full() -> GantryConfig {
    parse_config(FULL_CONFIG).expect("Failed to parse TOML")
}

/// Test parsing axis lines, scale and polarity.
#[test]
fn test_parse_axis_config() {
    let config = full();
    let x = config.axis("x").expect("Axis not found");

    assert_eq!(x.step_line, Line(5));
    assert_eq!(x.dir_line, Line(6));
    assert_eq!(x.enable_line, Line(13));
    assert_eq!(x.steps_per_mm, 80.0);
    assert!(x.direction_inverted);
    assert_eq!(x.pulse_width_us, 5);
    assert!(x.enable_active_low);

    let y1 = config.axis("y1").expect("Axis not found");
    assert_eq!(y1.pulse_width_us, 10);
    assert!(!y1.enable_active_low);
    assert!(config.axis("y2").unwrap().sensor.is_none());
}

/// Test sensor filter fields sit flat in the sensor table and fall back to defaults.
#[test]
fn test_parse_sensor_binding() {
    let config = full();

    let x_home = config.axis("x").unwrap().sensor.as_ref().expect("Sensor not found");
    assert_eq!(x_home.name.as_str(), "x_home");
    assert_eq!(x_home.line, Line(20));
    assert!(x_home.active_low);
    let filter = x_home.filter();
    assert_eq!(filter.debounce_ms, 50);
    assert_eq!(filter.filter_samples, 5);
    assert_eq!(filter.interference_threshold, 3);
    assert_eq!(filter.interference_window_ms, 1000);

    let y_home = config.axis("y1").unwrap().sensor.as_ref().unwrap();
    assert!(!y_home.active_low);
    assert_eq!(y_home.filter().debounce_ms, 100);
    assert_eq!(y_home.filter().interference_threshold, 4);
    assert_eq!(y_home.filter().interference_window_ms, 500);

    assert_eq!(config.sensor_axis("y_home"), Some("y1"));
    assert_eq!(config.sensor_axis("z_home"), None);
}

/// Test homing overrides merge with defaults.
#[test]
fn test_parse_homing_section() {
    let homing = full().homing;

    assert_eq!(homing.approach_speed_mm_s, 20.0);
    assert_eq!(homing.verify_speed_mm_s, 2.0);
    assert_eq!(homing.verify_distance_mm, 3.0);
    assert!((homing.verify_travel_mm() - 4.5).abs() < 1e-9);
    assert_eq!(homing.home_direction(), Direction::Forward);
    assert_eq!(homing.max_attempts, 3);
    assert_eq!(homing.max_interference_cycles, 2000);
}

/// Test coordination pairs and pacing.
#[test]
fn test_parse_coordination_section() {
    let coordination = full().coordination;

    assert_eq!(coordination.tick_delay_us, 100);
    assert_eq!(coordination.tolerance_steps, 1);
    assert_eq!(coordination.pairs.len(), 1);
    assert_eq!(coordination.pairs[0][0].as_str(), "y2");
    assert_eq!(coordination.pairs[0][1].as_str(), "y1");
}

/// Axis names keep their file order.
#[test]
fn test_axis_names_in_order() {
    let config = full();
    let names: Vec<_> = config.axis_names().collect();
    assert_eq!(names, ["x", "y1", "y2"]);
}

//! Example: home a two-axis gantry, then trace a circle.
//!
//! This example demonstrates how to:
//! - Build a gantry from TOML configuration
//! - Home each axis with the verify-then-trust protocol
//! - Approximate a circle with one waypoint per degree
//!
//! Everything runs on simulated lines and virtual time.
//!
//! Run with: `RUST_LOG=gantry_motion=debug cargo run --example home_and_trace`

use gantry_motion::hal::sim::{RecordingLines, SimClock};
use gantry_motion::{
    parse_config, targets, ConfigError, EmergencyStop, Gantry, HomingController, Line, Result,
    TargetMap,
};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
[axes.x]
step_line = 5
dir_line = 6
enable_line = 13
steps_per_mm = 80.0

[axes.x.sensor]
name = "x_home"
line = 20
debounce_ms = 20
filter_samples = 5

[axes.y]
step_line = 17
dir_line = 27
enable_line = 22
steps_per_mm = 80.0
direction_inverted = true

[axes.y.sensor]
name = "y_home"
line = 21
debounce_ms = 20
filter_samples = 5

[homing]
approach_speed_mm_s = 20.0
max_travel_mm = 300.0

[coordination]
tick_delay_us = 500
"#;

/// Carriage starts 12.5 mm (x) and 40 mm (y) away from its switch.
const X_SWITCH: i64 = -1000;
/// The y motor is mounted mirrored, so homing drives its carriage count upward.
const Y_SWITCH: i64 = 3200;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gantry_motion=info")),
        )
        .compact()
        .init();

    println!("=== Home and Trace Example ===\n");

    let config = parse_config(CONFIG)?;
    let clock = SimClock::new();
    let x_lines = RecordingLines::new(Line(5), Line(6))
        .with_clock(clock.clone())
        .with_sensor(Line(20), true, |pos, _| pos <= X_SWITCH);
    let y_lines = RecordingLines::new(Line(17), Line(27))
        .with_clock(clock.clone())
        .with_sensor(Line(21), true, |pos, _| pos >= Y_SWITCH);
    let (x_probe, y_probe) = (x_lines.clone(), y_lines.clone());

    let sim = clock.clone();
    let mut gantry = Gantry::from_config(
        config,
        move |name, _| {
            let lines = if name == "x" { x_lines.clone() } else { y_lines.clone() };
            Ok((lines, sim.clone()))
        },
        clock.clone(),
        clock.clone(),
        EmergencyStop::new(),
    )?;

    let controller = HomingController::new(gantry.config().homing)?;
    for axis in ["x", "y"] {
        let report = gantry.home_axis(axis, &controller)?;
        println!(
            "Homed {}: contact at {} steps after {} attempt(s), phases {:?}",
            report.axis, report.contact_steps, report.attempts, report.trace
        );
    }
    println!(
        "Carriage after homing: x={} y={} ({:.1} s virtual)\n",
        x_probe.carriage_steps(),
        y_probe.carriage_steps(),
        clock.elapsed_ns() as f64 / 1e9
    );

    // 10 mm radius circle centred 20 mm from home on both axes.
    let centre = 1600.0;
    let radius = 800.0;
    let waypoints: Vec<TargetMap> = (0..=360)
        .map(|deg| {
            let angle = (deg as f64).to_radians();
            targets(&[
                ("x", (centre + radius * angle.cos()).round() as i64),
                ("y", (centre + radius * angle.sin()).round() as i64),
            ])
        })
        .collect::<core::result::Result<Vec<_>, ConfigError>>()?;

    let start = gantry.move_to(&waypoints[0], 10_000)?;
    println!("Moved to circle start in {} ticks", start.ticks);

    let path = gantry.follow_path(&waypoints[1..], 50)?;
    println!(
        "Traced {} waypoints in {} ticks (converged: {})",
        waypoints.len() - 1,
        path.ticks,
        path.converged
    );

    for name in ["x", "y"] {
        if let Some(axis) = gantry.axis(name) {
            println!("  {}: {} steps ({:.2} mm)", name, axis.position_steps(), axis.position_mm());
        }
    }

    println!("\nSensor status:");
    for (name, status) in gantry.poll_sensors()?.iter() {
        println!(
            "  {}: raw={} filtered={} interference={} triggers={}",
            name, status.raw_state, status.filtered_state, status.interference_detected, status.trigger_count
        );
    }

    gantry.cleanup()?;
    println!("\n=== Example Complete ===");
    Ok(())
}

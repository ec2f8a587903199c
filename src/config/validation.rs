//! Configuration validation.

use heapless::String;

use crate::error::{ConfigError, Error, Result};

use super::{AxisConfig, CoordinationConfig, GantryConfig, HomingConfig, MAX_AXES};

/// Validate a gantry configuration.
///
/// Checks:
/// - Axis scale, pulse width and line assignments
/// - Sensor filter parameters and unique sensor names
/// - Homing speeds, distances and bounds
/// - Motor pairs reference distinct, existing axes
pub fn validate_config(config: &GantryConfig) -> Result<()> {
    for (name, axis) in config.axes.iter() {
        validate_axis(name.as_str(), axis)?;
    }

    validate_sensor_names(config)?;
    validate_homing(&config.homing)?;
    validate_coordination(&config.coordination, config)?;

    Ok(())
}

/// Validate one axis on its own.
pub fn validate_axis(name: &str, axis: &AxisConfig) -> Result<()> {
    if !axis.steps_per_mm.is_finite() || axis.steps_per_mm <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidStepsPerMm(axis.steps_per_mm)));
    }

    if axis.pulse_width_us == 0 {
        return Err(Error::Config(ConfigError::InvalidPulseWidth(axis.pulse_width_us)));
    }

    // Every line on an axis must be distinct
    let lines = axis.lines();
    for (i, line) in lines.iter().enumerate() {
        if lines[i + 1..].contains(line) {
            return Err(Error::Config(ConfigError::DuplicateLine {
                axis: String::try_from(name).unwrap_or_default(),
                line: *line,
            }));
        }
    }

    if let Some(sensor) = &axis.sensor {
        if sensor.name.is_empty() {
            return Err(Error::Config(ConfigError::SensorNotFound(String::new())));
        }
        sensor.filter().validate()?;
    }

    Ok(())
}

fn validate_sensor_names(config: &GantryConfig) -> Result<()> {
    // At most one sensor per axis.
    let names: heapless::Vec<&String<32>, MAX_AXES> = config
        .axes
        .values()
        .filter_map(|axis| axis.sensor.as_ref().map(|s| &s.name))
        .collect();

    for (i, name) in names.iter().enumerate() {
        if names[i + 1..].contains(name) {
            return Err(Error::Config(ConfigError::DuplicateSensorName((*name).clone())));
        }
    }

    Ok(())
}

/// Validate homing parameters.
pub fn validate_homing(homing: &HomingConfig) -> Result<()> {
    let positive = |v: f64| v.is_finite() && v > 0.0;

    let field = if !positive(homing.approach_speed_mm_s) {
        Some("approach_speed_mm_s")
    } else if !positive(homing.verify_speed_mm_s) {
        Some("verify_speed_mm_s")
    } else if !positive(homing.verify_distance_mm) {
        Some("verify_distance_mm")
    } else if !homing.verify_overtravel.is_finite() || homing.verify_overtravel <= 1.0 {
        Some("verify_overtravel")
    } else if !positive(homing.max_travel_mm) {
        Some("max_travel_mm")
    } else if homing.max_interference_cycles == 0 {
        Some("max_interference_cycles")
    } else if homing.max_attempts == 0 {
        Some("max_attempts")
    } else if homing.poll_interval_us == 0 {
        Some("poll_interval_us")
    } else {
        None
    };

    match field {
        Some(field) => Err(Error::Config(ConfigError::InvalidHomingParameter(field))),
        None => Ok(()),
    }
}

fn validate_coordination(coordination: &CoordinationConfig, config: &GantryConfig) -> Result<()> {
    for (i, [follower, leader]) in coordination.pairs.iter().enumerate() {
        let invalid = follower == leader
            || config.axis(follower.as_str()).is_none()
            || config.axis(leader.as_str()).is_none()
            // No chains, and one leader per follower
            || coordination.pairs.iter().any(|[f, _]| f == leader)
            || coordination.pairs[i + 1..].iter().any(|[f, _]| f == follower);

        if invalid {
            return Err(Error::Config(ConfigError::InvalidPairing {
                follower: follower.clone(),
                leader: leader.clone(),
            }));
        }
    }

    Ok(())
}

//! Configuration module for gantry-motion.
//!
//! Provides types for loading and validating axis, sensor, homing and coordination
//! settings from TOML files (with `std` feature) or pre-built values.

mod axis;
mod coordination;
mod homing;
#[cfg(feature = "std")]
mod loader;
mod mechanical;
mod sensor;
mod system;
mod validation;

pub use axis::{AxisConfig, SensorBinding};
pub use coordination::{CoordinationConfig, MAX_PAIRS};
pub use homing::HomingConfig;
pub use mechanical::AxisKinematics;
pub use sensor::{
    FilterConfig, DEFAULT_DEBOUNCE_MS, DEFAULT_FILTER_SAMPLES, DEFAULT_INTERFERENCE_THRESHOLD,
    DEFAULT_INTERFERENCE_WINDOW_MS,
};
pub use system::{GantryConfig, MAX_AXES};
pub use validation::{validate_axis, validate_config, validate_homing};

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

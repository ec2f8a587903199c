//! Gantry configuration - root configuration structure.

use heapless::{FnvIndexMap, String};
use serde::Deserialize;

use super::axis::AxisConfig;
use super::coordination::CoordinationConfig;
use super::homing::HomingConfig;

/// Maximum number of axes on one gantry.
pub const MAX_AXES: usize = 8;

/// Root configuration structure from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GantryConfig {
    /// Named axis configurations.
    pub axes: FnvIndexMap<String<32>, AxisConfig, MAX_AXES>,

    /// Homing protocol parameters.
    #[serde(default)]
    pub homing: HomingConfig,

    /// Coordinated stepping parameters.
    #[serde(default)]
    pub coordination: CoordinationConfig,
}

impl GantryConfig {
    /// Get an axis configuration by name.
    pub fn axis(&self, name: &str) -> Option<&AxisConfig> {
        self.axes
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    /// List all axis names.
    pub fn axis_names(&self) -> impl Iterator<Item = &str> {
        self.axes.keys().map(|s| s.as_str())
    }

    /// Axis that carries the named sensor.
    pub fn sensor_axis(&self, sensor: &str) -> Option<&str> {
        self.axes
            .iter()
            .find(|(_, axis)| axis.sensor.as_ref().is_some_and(|s| s.name.as_str() == sensor))
            .map(|(name, _)| name.as_str())
    }
}

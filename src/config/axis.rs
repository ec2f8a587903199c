//! Axis configuration from TOML.

use heapless::String;
use serde::Deserialize;

use crate::hal::Line;

use super::sensor::FilterConfig;

/// Complete axis configuration from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AxisConfig {
    /// STEP output line.
    pub step_line: Line,

    /// DIR output line.
    pub dir_line: Line,

    /// Driver enable output line.
    pub enable_line: Line,

    /// Steps per millimetre of carriage travel (microstepping included).
    pub steps_per_mm: f64,

    /// Flip the electrical direction sense.
    #[serde(default)]
    pub direction_inverted: bool,

    /// STEP high time in microseconds.
    #[serde(default = "default_pulse_width_us")]
    pub pulse_width_us: u32,

    /// Driver is enabled by pulling the enable line low.
    #[serde(default = "default_true")]
    pub enable_active_low: bool,

    /// Optional home/limit sensor on this axis.
    #[serde(default)]
    pub sensor: Option<SensorBinding>,
}

/// A sensor wired to an axis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorBinding {
    /// Unique sensor name (status map key).
    pub name: String<32>,

    /// Input line.
    pub line: Line,

    /// Sensor reads triggered when the line is low (hall sensor with pull-up).
    #[serde(default = "default_true")]
    pub active_low: bool,

    /// Debounce window (ms).
    #[serde(default = "super::sensor::default_debounce_ms")]
    pub debounce_ms: u32,

    /// Majority-vote ring size.
    #[serde(default = "super::sensor::default_filter_samples")]
    pub filter_samples: u32,

    /// Rising edges per window that mark interference.
    #[serde(default = "super::sensor::default_interference_threshold")]
    pub interference_threshold: u32,

    /// Interference detection window (ms).
    #[serde(default = "super::sensor::default_interference_window_ms")]
    pub interference_window_ms: u32,
}

fn default_pulse_width_us() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl AxisConfig {
    /// Axis with default pulse width and an active-low enable, no sensor.
    pub fn new(step_line: Line, dir_line: Line, enable_line: Line, steps_per_mm: f64) -> Self {
        Self {
            step_line,
            dir_line,
            enable_line,
            steps_per_mm,
            direction_inverted: false,
            pulse_width_us: default_pulse_width_us(),
            enable_active_low: true,
            sensor: None,
        }
    }

    /// Attach a sensor.
    pub fn with_sensor(mut self, sensor: SensorBinding) -> Self {
        self.sensor = Some(sensor);
        self
    }

    /// Flip the direction sense.
    pub fn inverted(mut self, inverted: bool) -> Self {
        self.direction_inverted = inverted;
        self
    }

    /// Lines used by this axis, outputs first.
    pub fn lines(&self) -> heapless::Vec<Line, 4> {
        let mut lines = heapless::Vec::new();
        let _ = lines.push(self.step_line);
        let _ = lines.push(self.dir_line);
        let _ = lines.push(self.enable_line);
        if let Some(sensor) = &self.sensor {
            let _ = lines.push(sensor.line);
        }
        lines
    }
}

impl SensorBinding {
    /// Active-low sensor with default filter parameters.
    ///
    /// Names longer than 32 bytes are truncated to an empty name and rejected by validation.
    pub fn new(name: &str, line: Line) -> Self {
        let filter = FilterConfig::default();
        Self {
            name: String::try_from(name).unwrap_or_default(),
            line,
            active_low: true,
            debounce_ms: filter.debounce_ms,
            filter_samples: filter.filter_samples,
            interference_threshold: filter.interference_threshold,
            interference_window_ms: filter.interference_window_ms,
        }
    }

    /// Use `filter` for this sensor.
    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.debounce_ms = filter.debounce_ms;
        self.filter_samples = filter.filter_samples;
        self.interference_threshold = filter.interference_threshold;
        self.interference_window_ms = filter.interference_window_ms;
        self
    }

    /// Filter parameters of this sensor.
    pub fn filter(&self) -> FilterConfig {
        FilterConfig {
            debounce_ms: self.debounce_ms,
            filter_samples: self.filter_samples,
            interference_threshold: self.interference_threshold,
            interference_window_ms: self.interference_window_ms,
        }
    }
}

//! Sensor filter parameters.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::sensor::{MAX_FILTER_SAMPLES, MAX_INTERFERENCE_THRESHOLD};

/// Default debounce window (ms).
pub const DEFAULT_DEBOUNCE_MS: u32 = 100;
/// Default majority-vote ring size.
pub const DEFAULT_FILTER_SAMPLES: u32 = 7;
/// Default rising edges per window that count as interference.
pub const DEFAULT_INTERFERENCE_THRESHOLD: u32 = 3;
/// Default interference detection window (ms).
pub const DEFAULT_INTERFERENCE_WINDOW_MS: u32 = 1000;

/// Parameters of one [`SensorFilter`](crate::sensor::SensorFilter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FilterConfig {
    /// A new filtered value must persist this long before it is reported.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,

    /// Majority-vote ring size (odd preferred).
    #[serde(default = "default_filter_samples")]
    pub filter_samples: u32,

    /// Raw rising edges within the window that mark interference.
    #[serde(default = "default_interference_threshold")]
    pub interference_threshold: u32,

    /// Sliding window for edge counting (ms).
    #[serde(default = "default_interference_window_ms")]
    pub interference_window_ms: u32,
}

pub(super) fn default_debounce_ms() -> u32 {
    DEFAULT_DEBOUNCE_MS
}

pub(super) fn default_filter_samples() -> u32 {
    DEFAULT_FILTER_SAMPLES
}

pub(super) fn default_interference_threshold() -> u32 {
    DEFAULT_INTERFERENCE_THRESHOLD
}

pub(super) fn default_interference_window_ms() -> u32 {
    DEFAULT_INTERFERENCE_WINDOW_MS
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            filter_samples: DEFAULT_FILTER_SAMPLES,
            interference_threshold: DEFAULT_INTERFERENCE_THRESHOLD,
            interference_window_ms: DEFAULT_INTERFERENCE_WINDOW_MS,
        }
    }
}

impl FilterConfig {
    /// Check every parameter against its range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::InvalidDebounce(self.debounce_ms));
        }
        if self.filter_samples == 0 || self.filter_samples as usize > MAX_FILTER_SAMPLES {
            return Err(ConfigError::InvalidFilterSamples(self.filter_samples));
        }
        if self.interference_threshold == 0
            || self.interference_threshold as usize > MAX_INTERFERENCE_THRESHOLD
        {
            return Err(ConfigError::InvalidInterferenceThreshold(
                self.interference_threshold,
            ));
        }
        if self.interference_window_ms == 0 {
            return Err(ConfigError::InvalidInterferenceWindow(
                self.interference_window_ms,
            ));
        }
        Ok(())
    }
}

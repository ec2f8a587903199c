//! Sensor status snapshots.

use heapless::{FnvIndexMap, String};

/// Maximum number of monitored sensors.
pub const MAX_SENSORS: usize = 8;

/// State of one monitored sensor as seen by its filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorStatus {
    /// Sensor name
    pub name: String<32>,
    /// Last raw reading
    pub raw_state: bool,
    /// Debounced, majority-voted state
    pub filtered_state: bool,
    /// Whether a burst of edges is currently classified as interference
    pub interference_detected: bool,
    /// Confirmed not-triggered to triggered transitions
    pub trigger_count: u32,
    /// Readings currently held in the vote ring
    pub history_samples: u32,
}

/// Status of every sensor, keyed by sensor name.
pub type SensorStatusMap = FnvIndexMap<String<32>, SensorStatus, MAX_SENSORS>;

//! Homing protocol parameters.

use serde::Deserialize;

use crate::motion::Direction;

/// Parameters of the Approach → Retreat → Verify protocol.
///
/// Every phase is bounded by one of these values, so a dead or inverted sensor ends in
/// a fault instead of driving the carriage into a hard stop.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct HomingConfig {
    /// Approach and retreat speed (mm/s).
    pub approach_speed_mm_s: f64,

    /// Verification re-approach speed (mm/s).
    pub verify_speed_mm_s: f64,

    /// Retreat distance after first contact (mm).
    pub verify_distance_mm: f64,

    /// Verification travel bound as a multiple of `verify_distance_mm`.
    pub verify_overtravel: f64,

    /// Approach travel bound (mm).
    pub max_travel_mm: f64,

    /// Consecutive polling cycles tolerated under interference.
    pub max_interference_cycles: u32,

    /// Home switch sits at the positive end of travel.
    pub home_direction_positive: bool,

    /// Full protocol attempts when verification fails.
    pub max_attempts: u32,

    /// Dwell between sensor polls while motion is paused (µs).
    pub poll_interval_us: u32,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            approach_speed_mm_s: 10.0,
            verify_speed_mm_s: 2.0,
            verify_distance_mm: 5.0,
            verify_overtravel: 1.5,
            max_travel_mm: 1000.0,
            max_interference_cycles: 2000,
            home_direction_positive: false,
            max_attempts: 2,
            poll_interval_us: 1000,
        }
    }
}

impl HomingConfig {
    /// Direction toward the home switch.
    #[inline]
    pub fn home_direction(&self) -> Direction {
        Direction::from(self.home_direction_positive)
    }

    /// Verification travel bound (mm).
    #[inline]
    pub fn verify_travel_mm(&self) -> f64 {
        self.verify_distance_mm * self.verify_overtravel
    }
}

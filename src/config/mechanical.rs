//! Kinematics derived from axis configuration.

use core::time::Duration;

use crate::error::AxisError;

use super::axis::AxisConfig;

/// Unit conversions for one axis, computed once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisKinematics {
    /// Steps per millimetre of travel.
    pub steps_per_mm: f64,

    /// STEP high time.
    pub pulse_width: Duration,
}

impl AxisKinematics {
    /// Derive kinematics from an axis configuration.
    pub fn from_config(config: &AxisConfig) -> Self {
        Self {
            steps_per_mm: config.steps_per_mm,
            pulse_width: Duration::from_micros(config.pulse_width_us as u64),
        }
    }

    /// Whole steps for a distance, rounded to nearest.
    ///
    /// # Errors
    ///
    /// `InvalidDistance` unless the distance is finite and positive.
    pub fn steps_for_mm(&self, distance_mm: f64) -> Result<u32, AxisError> {
        if !distance_mm.is_finite() || distance_mm <= 0.0 {
            return Err(AxisError::InvalidDistance(distance_mm));
        }
        let steps = libm::round(distance_mm * self.steps_per_mm);
        Ok(if steps >= u32::MAX as f64 { u32::MAX } else { steps as u32 })
    }

    /// Convert steps to millimetres.
    #[inline]
    pub fn steps_to_mm(&self, steps: i64) -> f64 {
        steps as f64 / self.steps_per_mm
    }

    /// Interval between pulse starts for a carriage speed: `1 / (speed * steps_per_mm)`.
    ///
    /// # Errors
    ///
    /// `InvalidSpeed` unless the speed is finite and positive.
    pub fn interval_for_speed(&self, speed_mm_s: f64) -> Result<Duration, AxisError> {
        if !speed_mm_s.is_finite() || speed_mm_s <= 0.0 {
            return Err(AxisError::InvalidSpeed(speed_mm_s));
        }
        let ns = libm::round(1_000_000_000.0 / (speed_mm_s * self.steps_per_mm));
        Ok(Duration::from_nanos(ns as u64))
    }

    /// Pulse width that leaves at least half of `interval` low.
    #[inline]
    pub fn pulse_width_for(&self, interval: Duration) -> Duration {
        self.pulse_width.min(interval / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::Line;

    fn kinematics() -> AxisKinematics {
        AxisKinematics::from_config(&AxisConfig::new(Line(5), Line(6), Line(13), 80.0))
    }

    #[test]
    fn test_steps_for_distance_rounds() {
        let k = kinematics();
        assert_eq!(k.steps_for_mm(5.0), Ok(400));
        assert_eq!(k.steps_for_mm(0.006), Ok(0));
        assert_eq!(k.steps_for_mm(0.007), Ok(1));
        assert_eq!(k.steps_for_mm(0.0), Err(AxisError::InvalidDistance(0.0)));
        assert!(k.steps_for_mm(f64::INFINITY).is_err());
    }

    #[test]
    fn test_interval_for_speed() {
        let k = kinematics();
        // 10 mm/s * 80 steps/mm = 800 steps/s
        assert_eq!(k.interval_for_speed(10.0), Ok(Duration::from_nanos(1_250_000)));
        assert_eq!(k.interval_for_speed(0.0), Err(AxisError::InvalidSpeed(0.0)));
        assert!(k.interval_for_speed(-1.0).is_err());
        assert!(k.interval_for_speed(f64::NAN).is_err());
    }

    #[test]
    fn test_pulse_width_clamped() {
        let k = kinematics();
        assert_eq!(k.pulse_width_for(Duration::from_millis(1)), Duration::from_micros(5));
        assert_eq!(k.pulse_width_for(Duration::from_micros(6)), Duration::from_micros(3));
    }
}

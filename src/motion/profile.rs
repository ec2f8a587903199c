//! Step timing profiles.
//!
//! Shaping is expressed directly in delay space: the ramp starts at twice the base
//! interval and closes linearly onto it, cruise holds the base interval, and the
//! deceleration ramp mirrors the acceleration ramp.

use core::time::Duration;

use crate::error::AxisError;

/// Longest ramp, in steps, regardless of the requested fraction.
pub const MAX_RAMP_STEPS: u32 = 100;

/// Largest accepted acceleration fraction (ramp up plus ramp down cover the whole move).
pub const MAX_ACCEL_FRACTION: f64 = 0.5;

/// Logical direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Increasing position.
    Forward,
    /// Decreasing position.
    Reverse,
}

impl Direction {
    /// Direction that reduces a signed delta.
    #[inline]
    pub fn from_delta(delta: i64) -> Self {
        if delta >= 0 {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    /// Position change per step.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }

    /// The opposite direction.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

impl From<bool> for Direction {
    fn from(forward: bool) -> Self {
        if forward {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }
}

/// Current phase of a burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionPhase {
    /// Interval shrinking toward the base interval.
    Accelerating,
    /// Constant base interval.
    Cruising,
    /// Interval growing back toward twice the base interval.
    Decelerating,
    /// Burst finished.
    Complete,
}

/// Timing for one burst of step pulses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionProfile {
    /// Number of pulses.
    pub total_steps: u32,

    /// Steps in each ramp (accel and decel are symmetric).
    pub ramp_steps: u32,

    /// Cruise interval between pulse starts (nanoseconds).
    pub base_interval_ns: u64,

    /// High time of each pulse (nanoseconds).
    pub pulse_width_ns: u32,
}

impl MotionProfile {
    /// Evenly spaced pulses.
    pub fn constant(total_steps: u32, interval: Duration, pulse_width: Duration) -> Self {
        Self {
            total_steps,
            ramp_steps: 0,
            base_interval_ns: interval.as_nanos() as u64,
            pulse_width_ns: pulse_width_ns(pulse_width),
        }
    }

    /// Trapezoidal shaping.
    ///
    /// The ramp covers `min(floor(total_steps * accel_fraction), MAX_RAMP_STEPS)` steps at
    /// each end of the move.
    ///
    /// # Errors
    ///
    /// `InvalidProfile` unless `accel_fraction` lies in `[0.0, 0.5]`.
    pub fn trapezoidal(
        total_steps: u32,
        base_interval: Duration,
        accel_fraction: f64,
        pulse_width: Duration,
    ) -> Result<Self, AxisError> {
        if !(0.0..=MAX_ACCEL_FRACTION).contains(&accel_fraction) {
            return Err(AxisError::InvalidProfile(accel_fraction));
        }

        let ramp = libm::floor(total_steps as f64 * accel_fraction) as u32;

        Ok(Self {
            total_steps,
            ramp_steps: ramp.min(MAX_RAMP_STEPS),
            base_interval_ns: base_interval.as_nanos() as u64,
            pulse_width_ns: pulse_width_ns(pulse_width),
        })
    }

    /// Create a zero-length profile (no motion).
    pub fn zero() -> Self {
        Self {
            total_steps: 0,
            ramp_steps: 0,
            base_interval_ns: 0,
            pulse_width_ns: 0,
        }
    }

    /// Check if this is a zero-length profile.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.total_steps == 0
    }

    /// Steps in the cruise segment.
    #[inline]
    pub fn cruise_steps(&self) -> u32 {
        self.total_steps.saturating_sub(2 * self.ramp_steps)
    }

    /// Get the phase at a given step number.
    pub fn phase_at(&self, step: u32) -> MotionPhase {
        if step >= self.total_steps {
            MotionPhase::Complete
        } else if step < self.ramp_steps {
            MotionPhase::Accelerating
        } else if step >= self.total_steps - self.ramp_steps {
            MotionPhase::Decelerating
        } else {
            MotionPhase::Cruising
        }
    }

    /// Interval that follows pulse `step`, in nanoseconds.
    pub fn interval_at(&self, step: u32) -> u64 {
        let base = self.base_interval_ns;
        let ramp = self.ramp_steps as u64;

        match self.phase_at(step) {
            MotionPhase::Complete => 0,
            MotionPhase::Cruising => base,
            MotionPhase::Accelerating => base + base * (ramp - step as u64) / ramp,
            MotionPhase::Decelerating => {
                let j = (step - (self.total_steps - self.ramp_steps)) as u64;
                base + base * j / ramp
            }
        }
    }

    /// Time from the first pulse start to the end of the last pulse.
    pub fn duration(&self) -> Duration {
        if self.is_zero() {
            return Duration::ZERO;
        }
        let gaps: u64 = (0..self.total_steps - 1).map(|i| self.interval_at(i)).sum();
        Duration::from_nanos(gaps + self.pulse_width_ns as u64)
    }
}

fn pulse_width_ns(pulse_width: Duration) -> u32 {
    pulse_width.as_nanos().min(u32::MAX as u128) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_micros(500);
    const PULSE: Duration = Duration::from_micros(5);

    #[test]
    fn test_ramp_capped_at_max() {
        let profile = MotionProfile::trapezoidal(1000, BASE, 0.25, PULSE).unwrap();
        assert_eq!(profile.ramp_steps, 100);
        assert_eq!(profile.cruise_steps(), 800);

        let short = MotionProfile::trapezoidal(40, BASE, 0.25, PULSE).unwrap();
        assert_eq!(short.ramp_steps, 10);
    }

    #[test]
    fn test_ramp_endpoints() {
        let profile = MotionProfile::trapezoidal(1000, BASE, 0.25, PULSE).unwrap();

        assert_eq!(profile.interval_at(0), 1_000_000);
        assert_eq!(profile.interval_at(50), 750_000);
        assert_eq!(profile.interval_at(100), 500_000);
        assert_eq!(profile.interval_at(899), 500_000);
        assert_eq!(profile.interval_at(900), 500_000);
        assert_eq!(profile.interval_at(999), 995_000);
        assert_eq!(profile.interval_at(1000), 0);
    }

    #[test]
    fn test_fraction_out_of_range() {
        assert_eq!(
            MotionProfile::trapezoidal(100, BASE, 0.6, PULSE),
            Err(AxisError::InvalidProfile(0.6))
        );
        assert!(MotionProfile::trapezoidal(100, BASE, -0.1, PULSE).is_err());
        assert!(MotionProfile::trapezoidal(100, BASE, f64::NAN, PULSE).is_err());
        assert!(MotionProfile::trapezoidal(100, BASE, 0.5, PULSE).is_ok());
    }

    #[test]
    fn test_zero_fraction_is_constant() {
        let profile = MotionProfile::trapezoidal(10, BASE, 0.0, PULSE).unwrap();
        assert_eq!(profile, MotionProfile::constant(10, BASE, PULSE));
        assert!((0..10).all(|i| profile.interval_at(i) == 500_000));
    }

    #[test]
    fn test_duration() {
        let profile = MotionProfile::constant(4, Duration::from_millis(1), PULSE);
        assert_eq!(profile.duration(), Duration::from_micros(3_005));
        assert_eq!(MotionProfile::zero().duration(), Duration::ZERO);
    }
}

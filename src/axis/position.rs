//! Position tracking for one axis.
//!
//! Provides absolute position tracking in steps with millimetre conversions.

/// Axis position tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    /// Current position in steps (from origin)
    steps: i64,
    /// Steps per millimetre for conversions
    steps_per_mm: f64,
}

impl Position {
    /// Create a new position tracker at the origin.
    #[inline]
    pub fn new(steps_per_mm: f64) -> Self {
        Self {
            steps: 0,
            steps_per_mm,
        }
    }

    /// Create a position tracker at a specific position.
    #[inline]
    pub fn at(steps: i64, steps_per_mm: f64) -> Self {
        Self {
            steps,
            steps_per_mm,
        }
    }

    /// Get current position in steps.
    #[inline]
    pub fn steps(&self) -> i64 {
        self.steps
    }

    /// Get current position in millimetres.
    #[inline]
    pub fn mm(&self) -> f64 {
        self.steps as f64 / self.steps_per_mm
    }

    /// Set position in steps.
    #[inline]
    pub fn set_steps(&mut self, steps: i64) {
        self.steps = steps;
    }

    /// Move by a number of steps.
    #[inline]
    pub fn move_steps(&mut self, delta: i64) {
        self.steps += delta;
    }

    /// Set current position as the new origin.
    #[inline]
    pub fn set_origin(&mut self) {
        self.steps = 0;
    }

    /// Signed steps needed to reach a target position in millimetres.
    #[inline]
    pub fn steps_to(&self, target_mm: f64) -> i64 {
        libm::round(target_mm * self.steps_per_mm) as i64 - self.steps
    }
}

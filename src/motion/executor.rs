//! Stepwise burst execution.

use super::profile::{Direction, MotionPhase, MotionProfile};

/// Runtime state of a burst in flight.
#[derive(Debug, Clone)]
pub struct MotionExecutor {
    /// The profile being executed.
    profile: MotionProfile,

    /// Travel direction.
    direction: Direction,

    /// Pulses emitted so far.
    current_step: u32,

    /// Current phase of motion.
    phase: MotionPhase,
}

impl MotionExecutor {
    /// Create a new executor for a motion profile.
    pub fn new(direction: Direction, profile: MotionProfile) -> Self {
        let phase = profile.phase_at(0);
        Self {
            profile,
            direction,
            current_step: 0,
            phase,
        }
    }

    /// Check if motion is complete.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.phase == MotionPhase::Complete
    }

    /// Pulses emitted so far.
    #[inline]
    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    /// Get steps remaining.
    #[inline]
    pub fn steps_remaining(&self) -> u32 {
        self.profile.total_steps.saturating_sub(self.current_step)
    }

    /// Get the current phase.
    #[inline]
    pub fn phase(&self) -> MotionPhase {
        self.phase
    }

    /// Travel direction.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Interval that follows the pulse about to be emitted, in nanoseconds.
    #[inline]
    pub fn current_interval_ns(&self) -> u64 {
        self.profile.interval_at(self.current_step)
    }

    /// Get the motion profile.
    #[inline]
    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }

    /// Record one emitted pulse.
    ///
    /// Returns `true` if another pulse follows.
    pub fn advance(&mut self) -> bool {
        if self.is_complete() {
            return false;
        }

        self.current_step += 1;
        self.phase = self.profile.phase_at(self.current_step);
        !self.is_complete()
    }

    /// Get progress as a fraction (0.0 to 1.0).
    #[inline]
    pub fn progress(&self) -> f32 {
        if self.profile.total_steps == 0 {
            1.0
        } else {
            self.current_step as f32 / self.profile.total_steps as f32
        }
    }
}

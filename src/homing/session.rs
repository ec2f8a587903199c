//! Homing session bookkeeping.

use core::fmt;

use heapless::{String, Vec};
use tracing::info;

/// Longest phase trace kept per session.
pub const MAX_TRACE: usize = 16;

/// Phase of the homing protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingPhase {
    /// Moving toward the sensor until confirmed contact.
    Approach,
    /// Backing off to clear the switch.
    Retreat,
    /// Slow re-approach that must trigger again.
    Verify,
    /// Origin set at the verified contact point.
    Homed,
    /// Terminal failure.
    Faulted,
}

impl HomingPhase {
    /// Whether no further transition can happen.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, HomingPhase::Homed | HomingPhase::Faulted)
    }
}

impl fmt::Display for HomingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HomingPhase::Approach => "Approach",
            HomingPhase::Retreat => "Retreat",
            HomingPhase::Verify => "Verify",
            HomingPhase::Homed => "Homed",
            HomingPhase::Faulted => "Faulted",
        };
        f.write_str(name)
    }
}

/// State of one homing run, alive from start until a terminal phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomingSession {
    axis_id: String<32>,
    phase: HomingPhase,
    attempts: u32,
    last_verified_position: Option<i64>,
    trace: Vec<HomingPhase, MAX_TRACE>,
}

impl HomingSession {
    pub(crate) fn new(axis_id: &str) -> Self {
        let mut trace = Vec::new();
        let _ = trace.push(HomingPhase::Approach);
        Self {
            axis_id: String::try_from(axis_id).unwrap_or_default(),
            phase: HomingPhase::Approach,
            attempts: 0,
            last_verified_position: None,
            trace,
        }
    }

    /// Axis being homed.
    #[inline]
    pub fn axis_id(&self) -> &str {
        self.axis_id.as_str()
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> HomingPhase {
        self.phase
    }

    /// Attempts started so far.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Position (before zeroing) of the last verified contact.
    #[inline]
    pub fn last_verified_position(&self) -> Option<i64> {
        self.last_verified_position
    }

    /// Phases visited, in order.
    #[inline]
    pub fn trace(&self) -> &[HomingPhase] {
        &self.trace
    }

    pub(crate) fn begin_attempt(&mut self) {
        self.attempts += 1;
        if self.attempts > 1 {
            self.transition(HomingPhase::Approach);
        }
    }

    pub(crate) fn record_contact(&mut self, position: i64) {
        self.last_verified_position = Some(position);
    }

    pub(crate) fn transition(&mut self, next: HomingPhase) {
        info!(
            axis = self.axis_id.as_str(),
            from = %self.phase,
            to = %next,
            attempt = self.attempts,
            "homing phase"
        );
        self.phase = next;
        // A full trace keeps its first entries; the final phase is always in `phase`.
        let _ = self.trace.push(next);
    }
}

//! Runtime axis state.
//!
//! `Disabled` is orthogonal to `Idle`/`Moving`: an idle axis may be disabled, and any
//! burst re-enables it.

/// Snapshot of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisState {
    /// Driver enable line is active.
    pub enabled: bool,
    /// A step burst is in flight.
    pub moving: bool,
    /// Logical position in steps.
    pub position_steps: i64,
}

impl AxisState {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match (self.enabled, self.moving) {
            (_, true) => "moving",
            (true, false) => "idle",
            (false, false) => "disabled",
        }
    }
}

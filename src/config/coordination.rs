//! Multi-axis coordination parameters.

use heapless::{String, Vec};
use serde::Deserialize;

/// Maximum number of motor pairs.
pub const MAX_PAIRS: usize = 4;

/// Tick pacing, convergence tolerance and motor pairs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Pause after each tick that stepped at least one axis (µs).
    pub tick_delay_us: u32,

    /// An axis counts as arrived within this many steps of its target.
    pub tolerance_steps: u32,

    /// `[follower, leader]` pairs; a follower always takes its leader's target.
    pub pairs: Vec<[String<32>; 2], MAX_PAIRS>,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            tick_delay_us: 250,
            tolerance_steps: 1,
            pairs: Vec::new(),
        }
    }
}

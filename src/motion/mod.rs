//! Motion module for gantry-motion.
//!
//! Provides step timing profiles and stepwise burst execution.

mod executor;
mod profile;

pub use executor::MotionExecutor;
pub use profile::{Direction, MotionPhase, MotionProfile, MAX_ACCEL_FRACTION, MAX_RAMP_STEPS};

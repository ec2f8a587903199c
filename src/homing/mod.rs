//! Homing module for gantry-motion.
//!
//! A bounded Approach → Retreat → Verify protocol that only trusts a contact once it
//! has been seen twice.

mod controller;
mod session;

pub use controller::{HomingController, HomingReport};
pub use session::{HomingPhase, HomingSession, MAX_TRACE};

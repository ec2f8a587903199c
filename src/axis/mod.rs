//! Axis module for gantry-motion.
//!
//! Provides the stepper axis driver with position tracking and a builder.

mod builder;
mod driver;
mod position;
mod state;

pub use builder::StepperAxisBuilder;
pub use driver::StepperAxis;
pub use position::Position;
pub use state::AxisState;

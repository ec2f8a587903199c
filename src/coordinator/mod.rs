//! Coordinated multi-axis stepping.

mod stepper;

pub use stepper::{targets, Convergence, MultiAxisStepper, TargetMap};

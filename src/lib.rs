//! # gantry-motion
//!
//! EMI-aware limit sensing, verified homing and step pulse generation for stepper
//! gantries, on embedded-hal 1.0.
//!
//! ## Features
//!
//! - **Sensor conditioning**: majority vote, debounce and interference classification
//!   so motor-driver noise is never mistaken for switch contact
//! - **Verified homing**: Approach → Retreat → Verify, every phase bounded, every fault
//!   typed with the phase it happened in
//! - **Pulse generation**: blocking or incremental step bursts with trapezoidal shaping
//!   and an emergency stop checked between pulses
//! - **Coordinated stepping**: several axes (and paired motors) converge on shared
//!   waypoints one step per tick
//! - **no_std compatible**: the core only needs `embedded-hal`, `heapless` and `libm`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gantry_motion::{Gantry, HomingController, EmergencyStop, StdDelay, MonotonicClock};
//!
//! let config = gantry_motion::load_config("gantry.toml")?;
//! let mut gantry = Gantry::from_config(
//!     config,
//!     |name, axis| Ok((lines_for(name, axis)?, StdDelay)),
//!     StdDelay,
//!     MonotonicClock::new(),
//!     EmergencyStop::new(),
//! )?;
//!
//! let controller = HomingController::new(gantry.config().homing)?;
//! gantry.home_axis("x", &controller)?;
//! gantry.move_to(&gantry_motion::targets(&[("x", 800), ("y", 400)])?, 10_000)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): file loading, TOML parsing, simulated hardware, status board
//! - `alloc`: enables heap allocation for no_std with allocator
//! - `defmt`: derives `defmt::Format` on line and state types

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Core modules
pub mod axis;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gantry;
pub mod hal;
pub mod homing;
pub mod motion;
pub mod sensor;

// Re-exports for ergonomic API
pub use axis::{AxisState, StepperAxis, StepperAxisBuilder};
pub use config::{validate_config, AxisConfig, FilterConfig, GantryConfig, HomingConfig, SensorBinding};
pub use coordinator::{targets, Convergence, MultiAxisStepper, TargetMap};
pub use error::{AxisError, ConfigError, Error, HomingError, HomingFault, Result};
pub use gantry::Gantry;
pub use hal::{Clock, EmergencyStop, GpioLines, Line, LineMode, PinLines, Timestamp};
pub use homing::{HomingController, HomingPhase, HomingReport};
pub use motion::{Direction, MotionPhase, MotionProfile};
pub use sensor::{SensorFilter, SensorStatus, SensorStatusMap};

#[cfg(feature = "std")]
pub use hal::{MonotonicClock, StdDelay};
#[cfg(feature = "std")]
pub use sensor::StatusBoard;

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

//! Sensor conditioning.
//!
//! A [`SensorFilter`] turns raw hall-sensor samples into a trustworthy state and
//! classifies bursts of edges as interference instead of contact.

#[cfg(feature = "std")]
mod board;
mod filter;
mod status;

#[cfg(feature = "std")]
pub use board::StatusBoard;
pub use filter::{SensorFilter, MAX_FILTER_SAMPLES, MAX_INTERFERENCE_THRESHOLD};
pub use status::{SensorStatus, SensorStatusMap, MAX_SENSORS};

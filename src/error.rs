//! Error types for gantry-motion.
//!
//! Configuration problems are rejected at setup time, axis errors cover a single
//! step burst, and homing errors carry the phase in which the protocol gave up.

use core::fmt;

use heapless::String;

use crate::hal::Line;
use crate::homing::HomingPhase;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all gantry-motion operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Axis motion error
    Axis(AxisError),
    /// Homing protocol fault
    Homing(HomingError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(String<128>),
    /// Debounce window must be at least 1 ms
    InvalidDebounce(u32),
    /// Filter sample count must be 1..=32
    InvalidFilterSamples(u32),
    /// Interference threshold must be 1..=32
    InvalidInterferenceThreshold(u32),
    /// Interference detection window must be at least 1 ms
    InvalidInterferenceWindow(u32),
    /// Steps per millimeter must be finite and > 0
    InvalidStepsPerMm(f64),
    /// Step pulse width must be > 0 µs
    InvalidPulseWidth(u32),
    /// The same line is used twice on one axis
    DuplicateLine {
        /// Axis name
        axis: String<32>,
        /// Offending line
        line: Line,
    },
    /// Axis name not found in configuration
    AxisNotFound(String<32>),
    /// Axis name registered twice
    DuplicateAxis(String<32>),
    /// Sensor name not found
    SensorNotFound(String<32>),
    /// Two axes bind a sensor with the same name
    DuplicateSensorName(String<32>),
    /// A homing parameter is out of range (field name)
    InvalidHomingParameter(&'static str),
    /// A motor pairing references an unknown axis or itself
    InvalidPairing {
        /// Follower axis
        follower: String<32>,
        /// Leader axis
        leader: String<32>,
    },
    /// A fixed-capacity table is full (table name)
    CapacityExceeded(&'static str),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(String<128>),
}

/// Which line operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineOp {
    /// `setup(line, mode)`
    Setup,
    /// `write(line, value)`
    Write,
    /// `read(line)`
    Read,
    /// `cleanup(lines)`
    Cleanup,
}

/// A hardware line access that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineFault {
    /// Line being accessed
    pub line: Line,
    /// Operation that failed
    pub op: LineOp,
}

/// Errors raised by a single axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisError {
    /// A step burst is already in progress on this axis
    AlreadyMoving,
    /// Speed must be finite and > 0 (mm/s)
    InvalidSpeed(f64),
    /// Distance must be finite and > 0 (mm)
    InvalidDistance(f64),
    /// Acceleration fraction must lie in [0.0, 0.5]
    InvalidProfile(f64),
    /// The axis has no sensor bound
    NoSensor,
    /// The emergency stop was raised during the burst
    Cancelled,
    /// A line read or write failed; the axis has been disabled
    Hardware(LineFault),
}

/// Why a homing attempt faulted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HomingFault {
    /// Interference persisted longer than the allowed number of polling cycles
    InterferenceTimeout {
        /// Cycles spent under interference
        cycles: u32,
    },
    /// The sensor never triggered within the approach travel bound
    NoContact {
        /// Steps travelled before giving up
        travel_steps: u32,
    },
    /// The sensor did not read clear at the end of the retreat
    SwitchStuck {
        /// Steps retreated
        retreat_steps: u32,
    },
    /// No second trigger within the verification travel bound
    VerificationFailed {
        /// Steps travelled while re-approaching
        travel_steps: u32,
    },
    /// The emergency stop was raised
    Cancelled,
    /// No axis with the requested name
    UnknownAxis,
    /// The axis follows a leader and is homed together with it
    Follower,
    /// The axis reported an error
    Axis(AxisError),
}

/// Terminal failure of a homing attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct HomingError {
    /// Axis being homed
    pub axis: String<32>,
    /// Phase in which the fault happened
    pub phase: HomingPhase,
    /// What went wrong
    pub fault: HomingFault,
}

impl HomingError {
    /// Create a new homing error.
    pub fn new(axis: &str, phase: HomingPhase, fault: HomingFault) -> Self {
        Self {
            axis: String::try_from(axis).unwrap_or_default(),
            phase,
            fault,
        }
    }

    /// Whether a new attempt may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(self.fault, HomingFault::VerificationFailed { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Axis(e) => write!(f, "Axis error: {}", e),
            Error::Homing(e) => write!(f, "Homing error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidDebounce(v) => write!(f, "Invalid debounce: {} ms. Must be >= 1", v),
            ConfigError::InvalidFilterSamples(v) => {
                write!(f, "Invalid filter samples: {}. Must be 1-32", v)
            }
            ConfigError::InvalidInterferenceThreshold(v) => {
                write!(f, "Invalid interference threshold: {}. Must be 1-32", v)
            }
            ConfigError::InvalidInterferenceWindow(v) => {
                write!(f, "Invalid interference window: {} ms. Must be >= 1", v)
            }
            ConfigError::InvalidStepsPerMm(v) => write!(f, "Invalid steps per mm: {}. Must be > 0", v),
            ConfigError::InvalidPulseWidth(v) => write!(f, "Invalid pulse width: {} us. Must be > 0", v),
            ConfigError::DuplicateLine { axis, line } => {
                write!(f, "Axis '{}' uses line {} more than once", axis, line.0)
            }
            ConfigError::AxisNotFound(name) => write!(f, "Axis '{}' not found", name),
            ConfigError::DuplicateAxis(name) => write!(f, "Axis '{}' registered twice", name),
            ConfigError::SensorNotFound(name) => write!(f, "Sensor '{}' not found", name),
            ConfigError::DuplicateSensorName(name) => write!(f, "Duplicate sensor name: '{}'", name),
            ConfigError::InvalidHomingParameter(field) => {
                write!(f, "Invalid homing parameter: {}", field)
            }
            ConfigError::InvalidPairing { follower, leader } => {
                write!(f, "Invalid pairing: '{}' cannot follow '{}'", follower, leader)
            }
            ConfigError::CapacityExceeded(table) => write!(f, "Too many entries in {}", table),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for LineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LineOp::Setup => "setup",
            LineOp::Write => "write",
            LineOp::Read => "read",
            LineOp::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

impl fmt::Display for AxisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisError::AlreadyMoving => write!(f, "A step burst is already in progress"),
            AxisError::InvalidSpeed(v) => write!(f, "Invalid speed: {} mm/s. Must be > 0", v),
            AxisError::InvalidDistance(v) => write!(f, "Invalid distance: {} mm. Must be > 0", v),
            AxisError::InvalidProfile(v) => {
                write!(f, "Invalid acceleration fraction: {}. Must be 0.0-0.5", v)
            }
            AxisError::NoSensor => write!(f, "No sensor bound to axis"),
            AxisError::Cancelled => write!(f, "Motion cancelled by emergency stop"),
            AxisError::Hardware(fault) => {
                write!(f, "Line {} {} failed, axis disabled", fault.line.0, fault.op)
            }
        }
    }
}

impl fmt::Display for HomingFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomingFault::InterferenceTimeout { cycles } => {
                write!(f, "interference timeout after {} cycles (check sensor wiring/shielding)", cycles)
            }
            HomingFault::NoContact { travel_steps } => {
                write!(f, "no sensor contact within {} steps (sensor disconnected?)", travel_steps)
            }
            HomingFault::SwitchStuck { retreat_steps } => {
                write!(f, "switch did not clear within {} steps (mechanically stuck?)", retreat_steps)
            }
            HomingFault::VerificationFailed { travel_steps } => {
                write!(f, "no second trigger within {} steps", travel_steps)
            }
            HomingFault::Cancelled => write!(f, "cancelled"),
            HomingFault::UnknownAxis => write!(f, "unknown axis"),
            HomingFault::Follower => write!(f, "axis follows a leader; home the leader"),
            HomingFault::Axis(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for HomingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "axis '{}' faulted during {}: {}", self.axis, self.phase, self.fault)
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<AxisError> for Error {
    fn from(e: AxisError) -> Self {
        Error::Axis(e)
    }
}

impl From<HomingError> for Error {
    fn from(e: HomingError) -> Self {
        Error::Homing(e)
    }
}

impl From<LineFault> for AxisError {
    fn from(fault: LineFault) -> Self {
        AxisError::Hardware(fault)
    }
}

impl From<AxisError> for HomingFault {
    fn from(e: AxisError) -> Self {
        match e {
            AxisError::Cancelled => HomingFault::Cancelled,
            other => HomingFault::Axis(other),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for AxisError {}

#[cfg(feature = "std")]
impl std::error::Error for HomingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_axis_error_maps_to_cancelled_fault() {
        assert_eq!(HomingFault::from(AxisError::Cancelled), HomingFault::Cancelled);
        assert_eq!(
            HomingFault::from(AxisError::AlreadyMoving),
            HomingFault::Axis(AxisError::AlreadyMoving)
        );
    }

    #[test]
    fn homing_error_names_phase_and_kind() {
        let err = HomingError::new(
            "x",
            HomingPhase::Retreat,
            HomingFault::SwitchStuck { retreat_steps: 400 },
        );
        let msg = err.to_string();
        assert!(msg.contains("Retreat"));
        assert!(msg.contains("did not clear"));
        assert!(!err.is_retryable());
    }
}

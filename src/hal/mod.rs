//! Hardware seam.
//!
//! Every axis owns its own [`GpioLines`] capability instead of reaching for a global
//! GPIO module. Production code plugs in [`PinLines`] (embedded-hal pins) while tests
//! use the in-memory recorder from [`sim`].

use core::fmt::Debug;
use core::ops::Add;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use serde::Deserialize;

mod pins;
#[cfg(feature = "std")]
pub mod sim;

pub use pins::{NoPin, PinLines, PinLinesError};

/// A digital line number (BCM numbering on a Raspberry Pi, pin index elsewhere).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(transparent)]
pub struct Line(pub u8);

/// Direction and bias of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineMode {
    /// Push-pull output.
    Output,
    /// Floating input.
    Input,
    /// Input with pull-up bias (open-collector hall sensors).
    InputPullUp,
}

/// Digital line access used by axes and sensors.
///
/// `write` takes the electrical level (`true` = high); polarity handling such as
/// active-low enables lives in the caller.
pub trait GpioLines {
    /// Error raised by the underlying hardware.
    type Error: Debug;

    /// Configure a line.
    fn setup(&mut self, line: Line, mode: LineMode) -> Result<(), Self::Error>;

    /// Drive an output line.
    fn write(&mut self, line: Line, high: bool) -> Result<(), Self::Error>;

    /// Sample an input line.
    fn read(&mut self, line: Line) -> Result<bool, Self::Error>;

    /// Release lines back to a safe state.
    fn cleanup(&mut self, lines: &[Line]) -> Result<(), Self::Error>;
}

/// Monotonic time stamp in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create from microseconds.
    #[inline]
    pub const fn from_micros(us: u64) -> Self {
        Self(us)
    }

    /// Create from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms * 1_000)
    }

    /// Raw microseconds.
    #[inline]
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future.
    #[inline]
    pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_add(rhs.as_micros() as u64))
    }
}

/// Source of [`Timestamp`]s for sensor filtering.
pub trait Clock {
    /// Current time.
    fn now(&mut self) -> Timestamp;
}

#[cfg(feature = "std")]
type StopFlag = std::sync::Arc<AtomicBool>;
#[cfg(not(feature = "std"))]
type StopFlag = &'static AtomicBool;

/// Externally signalled stop condition, checked between individual pulses.
///
/// Clones share the same flag, so one clone can live in an operator thread or an
/// interrupt handler while the axes poll the others.
#[derive(Debug, Clone)]
pub struct EmergencyStop {
    flag: StopFlag,
}

impl EmergencyStop {
    /// Create a new, released stop flag.
    #[cfg(feature = "std")]
    pub fn new() -> Self {
        Self {
            flag: std::sync::Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wrap a statically allocated flag.
    #[cfg(not(feature = "std"))]
    pub const fn from_static(flag: &'static AtomicBool) -> Self {
        Self { flag }
    }

    /// Raise the stop.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Release the stop so motion may resume.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Whether the stop is currently raised.
    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(feature = "std")]
impl Default for EmergencyStop {
    fn default() -> Self {
        Self::new()
    }
}

/// Delay in nanoseconds that may exceed `u32::MAX`.
pub(crate) fn delay_long<D: embedded_hal::delay::DelayNs>(delay: &mut D, ns: u64) {
    let mut remaining = ns;
    while remaining > 0 {
        let chunk = remaining.min(u32::MAX as u64) as u32;
        delay.delay_ns(chunk);
        remaining -= chunk as u64;
    }
}

/// Thread-sleep delay provider.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

#[cfg(feature = "std")]
impl embedded_hal::delay::DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
}

/// Clock backed by `std::time::Instant`.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for MonotonicClock {
    fn now(&mut self) -> Timestamp {
        Timestamp(self.origin.elapsed().as_micros() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_elapsed_saturates() {
        let early = Timestamp::from_millis(5);
        let late = early + Duration::from_micros(1_500);

        assert_eq!(late.as_micros(), 6_500);
        assert_eq!(late.saturating_duration_since(early), Duration::from_micros(1_500));
        assert_eq!(early.saturating_duration_since(late), Duration::ZERO);
    }

    #[test]
    fn test_emergency_stop_shared_between_clones() {
        let stop = EmergencyStop::new();
        let remote = stop.clone();

        assert!(!stop.is_triggered());
        remote.trigger();
        assert!(stop.is_triggered());
        stop.clear();
        assert!(!remote.is_triggered());
    }

    #[test]
    fn test_delay_long_splits_chunks() {
        struct Total(u64);
        impl embedded_hal::delay::DelayNs for Total {
            fn delay_ns(&mut self, ns: u32) {
                self.0 += ns as u64;
            }
        }

        let mut total = Total(0);
        delay_long(&mut total, 10_000_000_000);
        assert_eq!(total.0, 10_000_000_000);
    }
}

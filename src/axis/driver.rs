//! Stepper axis driver.
//!
//! Generic over the [`GpioLines`] capability and an embedded-hal delay provider.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use heapless::String;
use tracing::{debug, error, info, warn};

use crate::config::{validate_axis, AxisConfig, AxisKinematics};
use crate::error::{AxisError, ConfigError, Error, LineFault, LineOp, Result};
use crate::hal::{delay_long, EmergencyStop, GpioLines, Line, LineMode};
use crate::motion::{Direction, MotionExecutor, MotionPhase, MotionProfile};

use super::position::Position;
use super::state::AxisState;

/// One physical axis: step/direction pulse generation, enable control and position.
///
/// The axis is the only writer of its lines and position. Every burst, blocking or
/// incremental, goes through one [`MotionExecutor`]; while it exists further burst
/// requests fail with [`AxisError::AlreadyMoving`].
pub struct StepperAxis<L, D>
where
    L: GpioLines,
    D: DelayNs,
{
    /// Axis name for logging.
    name: String<32>,

    /// Line assignment and polarity.
    config: AxisConfig,

    /// Unit conversions.
    kinematics: AxisKinematics,

    /// Hardware lines.
    lines: L,

    /// Delay provider for pulse timing.
    delay: D,

    /// Current logical position.
    position: Position,

    /// Enable line is active.
    enabled: bool,

    /// Last direction written (cached to avoid redundant writes).
    current_direction: Option<Direction>,

    /// Burst in flight, if any.
    executor: Option<MotionExecutor>,

    /// Stop flag checked before every pulse.
    stop: Option<EmergencyStop>,
}

impl<L, D> StepperAxis<L, D>
where
    L: GpioLines,
    D: DelayNs,
{
    /// Configure the lines and park them in a safe state: step and dir low, driver disabled.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid, or a hardware error if a
    /// line cannot be set up.
    pub fn new(name: &str, config: AxisConfig, lines: L, delay: D) -> Result<Self> {
        let name = String::try_from(name)
            .map_err(|_| Error::Config(ConfigError::CapacityExceeded("axis name")))?;
        validate_axis(name.as_str(), &config)?;

        let mut axis = Self {
            kinematics: AxisKinematics::from_config(&config),
            position: Position::new(config.steps_per_mm),
            name,
            config,
            lines,
            delay,
            enabled: false,
            current_direction: None,
            executor: None,
            stop: None,
        };
        axis.init_lines()?;
        Ok(axis)
    }

    fn init_lines(&mut self) -> core::result::Result<(), AxisError> {
        for line in [self.config.step_line, self.config.dir_line, self.config.enable_line] {
            self.setup_line(line, LineMode::Output)?;
        }
        if let Some(sensor) = &self.config.sensor {
            let (line, mode) = if sensor.active_low {
                (sensor.line, LineMode::InputPullUp)
            } else {
                (sensor.line, LineMode::Input)
            };
            self.setup_line(line, mode)?;
        }

        self.write_line(self.config.step_line, false)?;
        self.write_line(self.config.dir_line, false)?;
        self.write_enable(false)?;
        debug!(axis = self.name.as_str(), "lines configured");
        Ok(())
    }

    /// Get the axis name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Get the axis configuration.
    #[inline]
    pub fn config(&self) -> &AxisConfig {
        &self.config
    }

    /// Get the unit conversions.
    #[inline]
    pub fn kinematics(&self) -> &AxisKinematics {
        &self.kinematics
    }

    /// Configured STEP high time.
    #[inline]
    pub fn pulse_width(&self) -> Duration {
        self.kinematics.pulse_width
    }

    /// Check the given flag before every pulse.
    pub fn set_emergency_stop(&mut self, stop: EmergencyStop) {
        self.stop = Some(stop);
    }

    /// Current state snapshot.
    pub fn state(&self) -> AxisState {
        AxisState {
            enabled: self.enabled,
            moving: self.executor.is_some(),
            position_steps: self.position.steps(),
        }
    }

    /// Driver enable line is active.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A burst is in flight.
    #[inline]
    pub fn is_moving(&self) -> bool {
        self.executor.is_some()
    }

    /// Phase of the burst in flight.
    pub fn burst_phase(&self) -> MotionPhase {
        self.executor
            .as_ref()
            .map(MotionExecutor::phase)
            .unwrap_or(MotionPhase::Complete)
    }

    /// Get current position in steps.
    #[inline]
    pub fn position_steps(&self) -> i64 {
        self.position.steps()
    }

    /// Get current position in millimetres.
    #[inline]
    pub fn position_mm(&self) -> f64 {
        self.position.mm()
    }

    /// Set the current position as the origin (zero).
    pub fn set_origin(&mut self) {
        self.position.set_origin();
    }

    /// Overwrite the current position.
    pub fn set_position_steps(&mut self, steps: i64) {
        self.position.set_steps(steps);
    }

    /// Activate the driver.
    pub fn enable(&mut self) -> core::result::Result<(), AxisError> {
        if let Err(fault) = self.write_enable(true) {
            return Err(self.fault(fault));
        }
        if !self.enabled {
            info!(axis = self.name.as_str(), "enabled");
        }
        self.enabled = true;
        Ok(())
    }

    /// Release the driver. Always safe to call; ends any burst in flight.
    pub fn disable(&mut self) -> core::result::Result<(), AxisError> {
        self.executor = None;
        let was_enabled = self.enabled;
        self.enabled = false;
        self.write_enable(false).map_err(AxisError::Hardware)?;
        if was_enabled {
            info!(axis = self.name.as_str(), "disabled");
        }
        Ok(())
    }

    /// Emit `steps` pulses, one every `delay`, each `pulse_width` high. Blocks until done.
    pub fn step(
        &mut self,
        direction: impl Into<Direction>,
        steps: u32,
        delay: Duration,
        pulse_width: Duration,
    ) -> core::result::Result<(), AxisError> {
        self.run(direction.into(), MotionProfile::constant(steps, delay, pulse_width))
    }

    /// Move a distance at constant speed.
    ///
    /// `steps = round(distance_mm * steps_per_mm)`, one pulse every
    /// `1 / (speed_mm_s * steps_per_mm)` seconds.
    pub fn move_mm(
        &mut self,
        direction: impl Into<Direction>,
        distance_mm: f64,
        speed_mm_s: f64,
    ) -> core::result::Result<(), AxisError> {
        let interval = self.kinematics.interval_for_speed(speed_mm_s)?;
        let steps = self.kinematics.steps_for_mm(distance_mm)?;
        let pulse_width = self.kinematics.pulse_width_for(interval);
        self.run(direction.into(), MotionProfile::constant(steps, interval, pulse_width))
    }

    /// Move with trapezoidal shaping: ramps from `2 * base_delay` down to `base_delay` and back.
    pub fn move_with_profile(
        &mut self,
        direction: impl Into<Direction>,
        total_steps: u32,
        base_delay: Duration,
        accel_fraction: f64,
    ) -> core::result::Result<(), AxisError> {
        let pulse_width = self.kinematics.pulse_width_for(base_delay);
        let profile =
            MotionProfile::trapezoidal(total_steps, base_delay, accel_fraction, pulse_width)?;
        self.run(direction.into(), profile)
    }

    fn run(
        &mut self,
        direction: Direction,
        profile: MotionProfile,
    ) -> core::result::Result<(), AxisError> {
        self.start_burst(direction, profile)?;
        while !self.poll_burst()? {}
        Ok(())
    }

    /// Begin a burst without blocking; drive it with [`poll_burst`](Self::poll_burst).
    ///
    /// Enables the axis if needed and sets the direction line.
    pub fn start_burst(
        &mut self,
        direction: Direction,
        profile: MotionProfile,
    ) -> core::result::Result<(), AxisError> {
        if self.executor.is_some() {
            return Err(AxisError::AlreadyMoving);
        }
        if profile.is_zero() {
            return Ok(());
        }
        // No enable or DIR write while the stop is raised
        self.check_stop()?;

        if !self.enabled {
            self.enable()?;
        }
        if let Err(fault) = self.set_direction(direction) {
            return Err(self.fault(fault));
        }

        debug!(
            axis = self.name.as_str(),
            steps = profile.total_steps,
            ramp = profile.ramp_steps,
            forward = direction == Direction::Forward,
            "burst started"
        );
        self.executor = Some(MotionExecutor::new(direction, profile));
        Ok(())
    }

    /// Emit the next pulse of the burst in flight, followed by its interval.
    ///
    /// Returns `true` once the burst is complete (or if none is in flight).
    pub fn poll_burst(&mut self) -> core::result::Result<bool, AxisError> {
        let (direction, pulse_ns, interval_ns) = match &self.executor {
            Some(executor) => (
                executor.direction(),
                executor.profile().pulse_width_ns,
                executor.current_interval_ns(),
            ),
            None => return Ok(true),
        };

        self.check_stop()?;

        if let Err(fault) = self.pulse(pulse_ns) {
            return Err(self.fault(fault));
        }
        self.position.move_steps(direction.sign());

        let has_more = self.executor.as_mut().is_some_and(MotionExecutor::advance);
        if has_more {
            delay_long(&mut self.delay, interval_ns.saturating_sub(pulse_ns as u64));
        } else {
            self.executor = None;
            debug!(
                axis = self.name.as_str(),
                position = self.position.steps(),
                "burst complete"
            );
        }

        Ok(!has_more)
    }

    /// End the burst in flight early, leaving the driver enabled.
    ///
    /// Returns the number of pulses it emitted.
    pub fn halt_burst(&mut self) -> u32 {
        match self.executor.take() {
            Some(executor) => {
                debug!(
                    axis = self.name.as_str(),
                    emitted = executor.current_step(),
                    "burst halted"
                );
                executor.current_step()
            }
            None => 0,
        }
    }

    /// Fail with `Cancelled` if the emergency stop is raised, disabling the axis.
    pub fn check_stop(&mut self) -> core::result::Result<(), AxisError> {
        if !self.stop.as_ref().is_some_and(EmergencyStop::is_triggered) {
            return Ok(());
        }

        let emitted = self.halt_burst();
        if let Err(e) = self.disable() {
            error!(axis = self.name.as_str(), error = %e, "disable after stop failed");
        }
        warn!(axis = self.name.as_str(), emitted, "emergency stop, motion cancelled");
        Err(AxisError::Cancelled)
    }

    /// Block for `duration` without stepping.
    pub fn dwell(&mut self, duration: Duration) {
        delay_long(&mut self.delay, duration.as_nanos() as u64);
    }

    /// Logical sensor state, polarity applied.
    pub fn read_sensor(&mut self) -> core::result::Result<bool, AxisError> {
        let (line, active_low) = match &self.config.sensor {
            Some(sensor) => (sensor.line, sensor.active_low),
            None => return Err(AxisError::NoSensor),
        };

        match self.lines.read(line) {
            Ok(level) => Ok(level != active_low),
            Err(e) => {
                error!(axis = self.name.as_str(), line = line.0, error = ?e, "sensor read failed");
                Err(self.fault(LineFault { line, op: LineOp::Read }))
            }
        }
    }

    /// Disable the driver and release every line of this axis.
    pub fn cleanup(&mut self) -> core::result::Result<(), AxisError> {
        let disabled = self.disable();
        self.current_direction = None;

        let lines = self.config.lines();
        if let Err(e) = self.lines.cleanup(&lines) {
            error!(axis = self.name.as_str(), error = ?e, "line cleanup failed");
            return Err(AxisError::Hardware(LineFault {
                line: self.config.step_line,
                op: LineOp::Cleanup,
            }));
        }
        debug!(axis = self.name.as_str(), "lines released");
        disabled
    }

    /// Give back the line capability and delay provider.
    pub fn release(self) -> (L, D) {
        (self.lines, self.delay)
    }

    fn pulse(&mut self, pulse_ns: u32) -> core::result::Result<(), LineFault> {
        self.write_line(self.config.step_line, true)?;
        self.delay.delay_ns(pulse_ns);
        self.write_line(self.config.step_line, false)
    }

    fn set_direction(&mut self, direction: Direction) -> core::result::Result<(), LineFault> {
        if self.current_direction == Some(direction) {
            return Ok(());
        }

        let high = (direction == Direction::Forward) != self.config.direction_inverted;
        self.write_line(self.config.dir_line, high)?;
        // DIR setup time before the first STEP edge
        self.delay.delay_ns(self.kinematics.pulse_width.as_nanos() as u32);

        self.current_direction = Some(direction);
        Ok(())
    }

    fn write_enable(&mut self, enabled: bool) -> core::result::Result<(), LineFault> {
        let high = enabled != self.config.enable_active_low;
        self.write_line(self.config.enable_line, high)
    }

    fn setup_line(&mut self, line: Line, mode: LineMode) -> core::result::Result<(), AxisError> {
        self.lines.setup(line, mode).map_err(|e| {
            error!(axis = self.name.as_str(), line = line.0, error = ?e, "line setup failed");
            AxisError::Hardware(LineFault { line, op: LineOp::Setup })
        })
    }

    fn write_line(&mut self, line: Line, high: bool) -> core::result::Result<(), LineFault> {
        self.lines.write(line, high).map_err(|e| {
            error!(axis = self.name.as_str(), line = line.0, error = ?e, "line write failed");
            LineFault { line, op: LineOp::Write }
        })
    }

    /// Abandon the burst in flight and try to leave the driver disabled.
    fn fault(&mut self, fault: LineFault) -> AxisError {
        self.executor = None;
        self.enabled = false;
        if self.write_enable(false).is_err() {
            error!(axis = self.name.as_str(), "could not disable after hardware fault");
        }
        self.current_direction = None;
        AxisError::Hardware(fault)
    }
}

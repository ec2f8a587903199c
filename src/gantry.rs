//! Gantry facade.
//!
//! Owns every axis, one filter per bound sensor, a clock and the shared stop flag, and
//! exposes the operations an operator or path planner needs.

use embedded_hal::delay::DelayNs;
use heapless::{FnvIndexMap, String};
use tracing::{error, info, warn};

use crate::axis::{StepperAxis, StepperAxisBuilder};
use crate::config::{validate_config, AxisConfig, GantryConfig};
use crate::coordinator::{Convergence, MultiAxisStepper, TargetMap};
use crate::error::{AxisError, ConfigError, HomingError, HomingFault, Result};
use crate::hal::{Clock, EmergencyStop, GpioLines};
use crate::homing::{HomingController, HomingPhase, HomingReport};
use crate::sensor::{SensorFilter, SensorStatus, SensorStatusMap, MAX_SENSORS};
#[cfg(feature = "std")]
use crate::sensor::StatusBoard;

/// A configured gantry.
///
/// # Example
///
/// ```rust,ignore
/// let config = gantry_motion::load_config("gantry.toml")?;
/// let mut gantry = Gantry::from_config(
///     config,
///     |name, axis| Ok((lines_for(name, axis)?, StdDelay)),
///     StdDelay,
///     MonotonicClock::new(),
///     EmergencyStop::new(),
/// )?;
///
/// let controller = HomingController::new(gantry.config().homing)?;
/// gantry.home_axis("x", &controller)?;
/// ```
pub struct Gantry<L, D, T, C>
where
    L: GpioLines,
    D: DelayNs,
    T: DelayNs,
    C: Clock,
{
    config: GantryConfig,
    stepper: MultiAxisStepper<L, D, T>,
    /// Keyed by sensor name.
    filters: FnvIndexMap<String<32>, SensorFilter, MAX_SENSORS>,
    clock: C,
    stop: EmergencyStop,
    #[cfg(feature = "std")]
    board: StatusBoard,
}

impl<L, D, T, C> Gantry<L, D, T, C>
where
    L: GpioLines,
    D: DelayNs,
    T: DelayNs,
    C: Clock,
{
    /// Build every configured axis and sensor filter.
    ///
    /// `make_io` supplies the line capability and delay provider for each axis. All axes
    /// check `stop` before every pulse.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, `make_io` fails, or an axis
    /// cannot set up its lines.
    pub fn from_config<F>(
        config: GantryConfig,
        mut make_io: F,
        tick_delay: T,
        clock: C,
        stop: EmergencyStop,
    ) -> Result<Self>
    where
        F: FnMut(&str, &AxisConfig) -> Result<(L, D)>,
    {
        validate_config(&config)?;

        let mut stepper = MultiAxisStepper::with_config(tick_delay, &config.coordination);
        let mut filters = FnvIndexMap::new();

        for (name, axis_config) in config.axes.iter() {
            let (lines, delay) = make_io(name.as_str(), axis_config)?;
            let axis = StepperAxisBuilder::new()
                .name(name.as_str())
                .from_axis_config(axis_config)
                .lines(lines)
                .delay(delay)
                .emergency_stop(stop.clone())
                .build()?;
            stepper.add_axis(axis)?;

            if let Some(sensor) = &axis_config.sensor {
                let filter = SensorFilter::new(sensor.name.as_str(), sensor.filter())?;
                filters
                    .insert(sensor.name.clone(), filter)
                    .map_err(|_| ConfigError::CapacityExceeded("sensors"))?;
            }
        }

        for [follower, leader] in config.coordination.pairs.iter() {
            stepper.pair(follower.as_str(), leader.as_str())?;
        }

        info!(axes = stepper.len(), sensors = filters.len(), "gantry ready");

        Ok(Self {
            config,
            stepper,
            filters,
            clock,
            stop,
            #[cfg(feature = "std")]
            board: StatusBoard::new(),
        })
    }

    /// Configuration the gantry was built from.
    #[inline]
    pub fn config(&self) -> &GantryConfig {
        &self.config
    }

    /// The coordinator owning the axes.
    pub fn stepper(&self) -> &MultiAxisStepper<L, D, T> {
        &self.stepper
    }

    /// The coordinator owning the axes, mutably.
    pub fn stepper_mut(&mut self) -> &mut MultiAxisStepper<L, D, T> {
        &mut self.stepper
    }

    /// Get an axis by name.
    pub fn axis(&self, name: &str) -> Option<&StepperAxis<L, D>> {
        self.stepper.axis(name)
    }

    /// Get an axis by name, mutably.
    pub fn axis_mut(&mut self, name: &str) -> Option<&mut StepperAxis<L, D>> {
        self.stepper.axis_mut(name)
    }

    /// A clone of the stop flag, for an operator thread or interrupt handler.
    pub fn stop_handle(&self) -> EmergencyStop {
        self.stop.clone()
    }

    /// Shared view of the latest sensor statuses.
    #[cfg(feature = "std")]
    pub fn status_board(&self) -> StatusBoard {
        self.board.clone()
    }

    /// Run the homing protocol on `axis_id` using the filter of its bound sensor.
    ///
    /// Axes paired to `axis_id` mirror every homing pulse and are zeroed with it. A
    /// follower cannot be homed on its own and fails with [`HomingFault::Follower`].
    pub fn home_axis(
        &mut self,
        axis_id: &str,
        controller: &HomingController,
    ) -> core::result::Result<HomingReport, HomingError> {
        let fail = |fault: HomingFault| HomingError::new(axis_id, HomingPhase::Approach, fault);

        if self.stepper.leader_of(axis_id).is_some() {
            return Err(fail(HomingFault::Follower));
        }
        let (axis, mut followers) = self
            .stepper
            .group_mut(axis_id)
            .ok_or_else(|| fail(HomingFault::UnknownAxis))?;
        let sensor = axis
            .config()
            .sensor
            .as_ref()
            .map(|s| s.name.clone())
            .ok_or_else(|| fail(HomingFault::Axis(AxisError::NoSensor)))?;
        let filter = self
            .filters
            .iter_mut()
            .find(|(name, _)| **name == sensor)
            .map(|(_, filter)| filter)
            .ok_or_else(|| fail(HomingFault::Axis(AxisError::NoSensor)))?;

        let result = controller.home_group(axis, &mut followers, filter, &mut self.clock);

        #[cfg(feature = "std")]
        self.board.publish(&filter.status());

        result
    }

    /// Sample every bound sensor once.
    ///
    /// # Errors
    ///
    /// Stops at the first sensor read that fails; that axis is left disabled.
    pub fn poll_sensors(&mut self) -> core::result::Result<SensorStatusMap, AxisError> {
        let mut statuses = SensorStatusMap::new();

        for axis in self.stepper.axes_mut() {
            let Some(sensor) = axis.config().sensor.as_ref().map(|s| s.name.clone()) else {
                continue;
            };
            let Some(filter) = self
                .filters
                .iter_mut()
                .find(|(name, _)| **name == sensor)
                .map(|(_, filter)| filter)
            else {
                continue;
            };

            let raw = axis.read_sensor()?;
            let status = filter.sample(raw, self.clock.now());
            #[cfg(feature = "std")]
            self.board.publish(&status);
            // Same capacity as `filters`.
            let _ = statuses.insert(sensor, status);
        }

        Ok(statuses)
    }

    /// Latest status of every sensor, without sampling.
    pub fn get_sensor_status(&self) -> SensorStatusMap {
        let mut statuses = SensorStatusMap::new();
        for (name, filter) in self.filters.iter() {
            let _ = statuses.insert(name.clone(), filter.status());
        }
        statuses
    }

    /// Latest status of one sensor.
    pub fn sensor_status(&self, name: &str) -> Option<SensorStatus> {
        self.filter(name).map(SensorFilter::status)
    }

    /// Retune a sensor filter at runtime.
    pub fn configure_sensor(
        &mut self,
        name: &str,
        debounce_ms: u32,
        filter_samples: u32,
        interference_threshold: u32,
    ) -> core::result::Result<(), ConfigError> {
        self.filter_mut(name)?
            .configure(debounce_ms, filter_samples, interference_threshold)
    }

    /// Clear a sensor's trigger count and interference flag.
    pub fn reset_sensor(&mut self, name: &str) -> core::result::Result<(), ConfigError> {
        self.filter_mut(name)?.reset();
        Ok(())
    }

    /// Issue one coordinated tick toward `targets`.
    pub fn advance_toward(&mut self, targets: &TargetMap) -> core::result::Result<bool, AxisError> {
        self.stepper.advance_toward(targets)
    }

    /// Tick toward `targets` until they are reached or `max_ticks` have run.
    pub fn move_to(
        &mut self,
        targets: &TargetMap,
        max_ticks: u32,
    ) -> core::result::Result<Convergence, AxisError> {
        self.stepper.move_to(targets, max_ticks)
    }

    /// Visit `waypoints` in order.
    pub fn follow_path(
        &mut self,
        waypoints: &[TargetMap],
        max_ticks_per_waypoint: u32,
    ) -> core::result::Result<Convergence, AxisError> {
        self.stepper.follow_path(waypoints, max_ticks_per_waypoint)
    }

    /// Raise the stop flag and disable every axis now.
    ///
    /// Motion stays blocked until the flag is cleared through [`stop_handle`](Self::stop_handle).
    pub fn emergency_stop(&mut self) {
        self.stop.trigger();
        for axis in self.stepper.axes_mut() {
            axis.halt_burst();
            if let Err(e) = axis.disable() {
                error!(axis = axis.name(), error = %e, "disable during emergency stop failed");
            }
        }
        warn!("emergency stop raised");
    }

    /// Disable every axis and release all lines.
    ///
    /// Every axis is attempted; the first failure is returned.
    pub fn cleanup(&mut self) -> core::result::Result<(), AxisError> {
        let mut first_error = None;
        for axis in self.stepper.axes_mut() {
            if let Err(e) = axis.cleanup() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                info!("gantry released");
                Ok(())
            }
        }
    }

    fn filter(&self, name: &str) -> Option<&SensorFilter> {
        self.filters
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    fn filter_mut(&mut self, name: &str) -> core::result::Result<&mut SensorFilter, ConfigError> {
        self.filters
            .iter_mut()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
            .ok_or_else(|| ConfigError::SensorNotFound(String::try_from(name).unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorBinding;
    use crate::coordinator::targets;
    use crate::hal::sim::{RecordingLines, SimClock};
    use crate::hal::Line;

    type SimGantry = Gantry<RecordingLines, SimClock, SimClock, SimClock>;

    fn gantry() -> (SimGantry, RecordingLines) {
        let mut config = GantryConfig::default();
        config
            .axes
            .insert(
                String::try_from("x").unwrap(),
                AxisConfig::new(Line(5), Line(6), Line(13), 80.0)
                    .with_sensor(SensorBinding::new("x_home", Line(20))),
            )
            .unwrap();
        config
            .axes
            .insert(
                String::try_from("y").unwrap(),
                AxisConfig::new(Line(17), Line(27), Line(22), 80.0),
            )
            .unwrap();

        let clock = SimClock::new();
        // Home switch actuated at or beyond +3 steps.
        let x_lines = RecordingLines::new(Line(5), Line(6))
            .with_clock(clock.clone())
            .with_sensor(Line(20), true, |pos, _| pos >= 3);
        let probe = x_lines.clone();

        let sim = clock.clone();
        let gantry = Gantry::from_config(
            config,
            move |name, axis| {
                let lines = if name == "x" {
                    x_lines.clone()
                } else {
                    RecordingLines::new(axis.step_line, axis.dir_line)
                };
                Ok((lines, sim.clone()))
            },
            clock.clone(),
            clock,
            EmergencyStop::new(),
        )
        .unwrap();
        (gantry, probe)
    }

    #[test]
    fn test_from_config_builds_axes_and_filters() {
        let (gantry, _) = gantry();
        assert!(gantry.axis("x").is_some());
        assert!(gantry.axis("y").is_some());
        assert_eq!(gantry.get_sensor_status().len(), 1);
        assert!(gantry.sensor_status("x_home").is_some());
    }

    #[test]
    fn test_poll_sensors_publishes() {
        let (mut gantry, _) = gantry();
        let statuses = gantry.poll_sensors().unwrap();

        assert_eq!(statuses.len(), 1);
        let board = gantry.status_board().get("x_home").unwrap();
        assert!(!board.raw_state);
        assert_eq!(board.history_samples, 1);
    }

    #[test]
    fn test_home_unknown_axis() {
        let (mut gantry, _) = gantry();
        let controller = HomingController::new(gantry.config().homing).unwrap();

        let err = gantry.home_axis("z", &controller).unwrap_err();
        assert_eq!(err.fault, HomingFault::UnknownAxis);

        let err = gantry.home_axis("y", &controller).unwrap_err();
        assert_eq!(err.fault, HomingFault::Axis(AxisError::NoSensor));
    }

    #[test]
    fn test_emergency_stop_blocks_motion() {
        let (mut gantry, probe) = gantry();
        let goal = targets(&[("x", 10)]).unwrap();
        gantry.advance_toward(&goal).unwrap();

        gantry.emergency_stop();
        assert!(!gantry.axis("x").unwrap().is_enabled());
        assert_eq!(gantry.advance_toward(&goal), Err(AxisError::Cancelled));
        assert_eq!(probe.carriage_steps(), 1);

        gantry.stop_handle().clear();
        gantry.advance_toward(&goal).unwrap();
        assert_eq!(probe.carriage_steps(), 2);
    }

    #[test]
    fn test_unknown_sensor_config() {
        let (mut gantry, _) = gantry();
        assert!(matches!(
            gantry.reset_sensor("nope"),
            Err(ConfigError::SensorNotFound(_))
        ));
        gantry.configure_sensor("x_home", 10, 5, 3).unwrap();
        assert_eq!(gantry.sensor_status("x_home").unwrap().history_samples, 0);
    }
}

//! Verify-then-trust homing.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use heapless::{String, Vec};
use tracing::{debug, error, warn};

use crate::axis::StepperAxis;
use crate::config::{validate_homing, FilterConfig, HomingConfig};
use crate::error::{AxisError, HomingError, HomingFault, Result};
use crate::hal::{Clock, GpioLines};
use crate::motion::{Direction, MotionProfile};
use crate::sensor::{SensorFilter, SensorStatus};
#[cfg(feature = "std")]
use crate::sensor::StatusBoard;

use super::session::{HomingPhase, HomingSession, MAX_TRACE};

/// Outcome of a successful homing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomingReport {
    /// Axis that was homed.
    pub axis: String<32>,
    /// Attempts needed (1 unless verification failed and was retried).
    pub attempts: u32,
    /// Phases visited, in order.
    pub trace: Vec<HomingPhase, MAX_TRACE>,
    /// Position of the verified contact before the origin was moved onto it.
    pub contact_steps: i64,
}

/// Drives one axis through Approach → Retreat → Verify → Homed.
///
/// Each phase is a bounded step burst polled one pulse at a time. The sensor is
/// sampled before every pulse; while the filter reports interference, stepping
/// pauses and the pause is bounded by `max_interference_cycles`.
#[derive(Debug, Clone)]
pub struct HomingController {
    config: HomingConfig,
    #[cfg(feature = "std")]
    board: Option<StatusBoard>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Until {
    /// Stop at the first confirmed contact.
    Contact,
    /// Stop at a confirmed rising edge newer than the burst start.
    NewContact,
    /// Run the whole burst; the switch must read clear once it ends.
    Release,
}

#[derive(Debug, Default)]
struct DriveOutcome {
    contact: Option<i64>,
    pulses: u32,
    /// Filtered state read clear at the last judged sample.
    clear: bool,
}

/// Counts consecutive polling cycles spent under interference.
struct InterferenceWatch {
    cycles: u32,
    limit: u32,
}

impl InterferenceWatch {
    fn new(limit: u32) -> Self {
        Self { cycles: 0, limit }
    }

    /// Returns `true` while motion must stay paused.
    fn observe(&mut self, status: &SensorStatus) -> core::result::Result<bool, HomingFault> {
        if !status.interference_detected {
            self.cycles = 0;
            return Ok(false);
        }
        self.cycles += 1;
        if self.cycles > self.limit {
            return Err(HomingFault::InterferenceTimeout { cycles: self.cycles });
        }
        Ok(true)
    }
}

/// Everything one homing run touches.
///
/// Followers carry no sensor of their own here: they mirror every pulse of the
/// leader and are zeroed with it.
struct Probe<'a, 'f, L: GpioLines, D: DelayNs, C: Clock> {
    axis: &'a mut StepperAxis<L, D>,
    followers: &'a mut [&'f mut StepperAxis<L, D>],
    filter: &'a mut SensorFilter,
    clock: &'a mut C,
    #[cfg(feature = "std")]
    board: Option<&'a StatusBoard>,
}

impl<L: GpioLines, D: DelayNs, C: Clock> Probe<'_, '_, L, D, C> {
    fn start_burst(
        &mut self,
        direction: Direction,
        profile: MotionProfile,
    ) -> core::result::Result<(), AxisError> {
        // Followers pulse just before the leader, whose interval paces the group.
        let mirror = MotionProfile::constant(
            profile.total_steps,
            Duration::ZERO,
            Duration::from_nanos(profile.pulse_width_ns as u64),
        );
        for follower in self.followers.iter_mut() {
            follower.start_burst(direction, mirror.clone())?;
        }
        self.axis.start_burst(direction, profile)
    }

    fn poll_burst(&mut self) -> core::result::Result<(), AxisError> {
        for follower in self.followers.iter_mut() {
            follower.poll_burst()?;
        }
        self.axis.poll_burst()?;
        Ok(())
    }

    fn halt_burst(&mut self) {
        for follower in self.followers.iter_mut() {
            follower.halt_burst();
        }
        self.axis.halt_burst();
    }

    fn set_origin(&mut self) {
        for follower in self.followers.iter_mut() {
            follower.set_origin();
        }
        self.axis.set_origin();
    }

    fn disable(&mut self) -> core::result::Result<(), AxisError> {
        let mut result = self.axis.disable();
        for follower in self.followers.iter_mut() {
            result = result.and(follower.disable());
        }
        result
    }

    fn sample(&mut self) -> core::result::Result<SensorStatus, AxisError> {
        self.axis.check_stop()?;
        let raw = self.axis.read_sensor()?;
        let status = self.filter.sample(raw, self.clock.now());
        #[cfg(feature = "std")]
        if let Some(board) = self.board {
            board.publish(&status);
        }
        Ok(status)
    }
}

impl HomingController {
    /// Create a controller.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a homing parameter is out of range.
    pub fn new(config: HomingConfig) -> Result<Self> {
        validate_homing(&config)?;
        Ok(Self {
            config,
            #[cfg(feature = "std")]
            board: None,
        })
    }

    /// Publish every sample to `board`.
    #[cfg(feature = "std")]
    pub fn with_status_board(mut self, board: StatusBoard) -> Self {
        self.board = Some(board);
        self
    }

    /// Active parameters.
    #[inline]
    pub fn config(&self) -> &HomingConfig {
        &self.config
    }

    /// Home `axis` using `filter` on its bound sensor.
    ///
    /// On success the axis position is zero at the verified contact point and the
    /// driver stays enabled. On failure the axis is disabled and the error names the
    /// phase and the fault.
    pub fn home<L, D, C>(
        &self,
        axis: &mut StepperAxis<L, D>,
        filter: &mut SensorFilter,
        clock: &mut C,
    ) -> core::result::Result<HomingReport, HomingError>
    where
        L: GpioLines,
        D: DelayNs,
        C: Clock,
    {
        self.home_group(axis, &mut [], filter, clock)
    }

    /// Home `axis` with `followers` mechanically tied to it.
    ///
    /// Only the leader's sensor is judged. Every follower takes each pulse the leader
    /// takes, so the group ends zeroed at the same verified contact, and a fault
    /// disables every axis of the group.
    pub fn home_group<L, D, C>(
        &self,
        axis: &mut StepperAxis<L, D>,
        followers: &mut [&mut StepperAxis<L, D>],
        filter: &mut SensorFilter,
        clock: &mut C,
    ) -> core::result::Result<HomingReport, HomingError>
    where
        L: GpioLines,
        D: DelayNs,
        C: Clock,
    {
        if axis.config().sensor.is_none() {
            return Err(HomingError::new(
                axis.name(),
                HomingPhase::Approach,
                HomingFault::Axis(AxisError::NoSensor),
            ));
        }

        let mut session = HomingSession::new(axis.name());
        let mut probe = Probe {
            axis,
            followers,
            filter,
            clock,
            #[cfg(feature = "std")]
            board: self.board.as_ref(),
        };

        let result = loop {
            session.begin_attempt();
            probe.filter.reset();

            match self.attempt(&mut session, &mut probe) {
                Ok(contact) => break Ok(contact),
                Err(fault @ HomingFault::VerificationFailed { .. })
                    if session.attempts() < self.config.max_attempts =>
                {
                    warn!(
                        axis = session.axis_id(),
                        attempt = session.attempts(),
                        %fault,
                        "verification failed, retrying"
                    );
                }
                Err(fault) => break Err(fault),
            }
        };

        match result {
            Ok(contact) => {
                probe.set_origin();
                session.record_contact(contact);
                session.transition(HomingPhase::Homed);
                Ok(HomingReport {
                    axis: String::try_from(session.axis_id()).unwrap_or_default(),
                    attempts: session.attempts(),
                    trace: Vec::from_slice(session.trace()).unwrap_or_default(),
                    contact_steps: contact,
                })
            }
            Err(fault) => {
                let phase = session.phase();
                session.transition(HomingPhase::Faulted);
                if let Err(e) = probe.disable() {
                    error!(axis = session.axis_id(), error = %e, "disable after homing fault failed");
                }
                let err = HomingError::new(session.axis_id(), phase, fault);
                error!(error = %err, "homing failed");
                Err(err)
            }
        }
    }

    /// One Approach → Retreat → Verify pass; returns the verified contact position.
    fn attempt<L, D, C>(
        &self,
        session: &mut HomingSession,
        probe: &mut Probe<'_, '_, L, D, C>,
    ) -> core::result::Result<i64, HomingFault>
    where
        L: GpioLines,
        D: DelayNs,
        C: Clock,
    {
        let toward = self.config.home_direction();
        let away = toward.reversed();
        let kinematics = *probe.axis.kinematics();

        let approach_interval = kinematics.interval_for_speed(self.config.approach_speed_mm_s)?;
        let verify_interval = kinematics.interval_for_speed(self.config.verify_speed_mm_s)?;
        let approach_steps = kinematics.steps_for_mm(self.config.max_travel_mm)?;
        let retreat_steps = kinematics.steps_for_mm(self.config.verify_distance_mm)?;
        let verify_steps = kinematics.steps_for_mm(self.config.verify_travel_mm())?;

        // Approach
        let approach = MotionProfile::constant(
            approach_steps,
            approach_interval,
            kinematics.pulse_width_for(approach_interval),
        );
        let outcome = self.drive(probe, toward, approach, Until::Contact)?;
        let Some(first_contact) = outcome.contact else {
            return Err(HomingFault::NoContact {
                travel_steps: outcome.pulses,
            });
        };
        debug!(axis = session.axis_id(), position = first_contact, "first contact");

        // Retreat
        session.transition(HomingPhase::Retreat);
        let retreat = MotionProfile::constant(
            retreat_steps,
            approach_interval,
            kinematics.pulse_width_for(approach_interval),
        );
        let outcome = self.drive(probe, away, retreat, Until::Release)?;
        if !outcome.clear {
            return Err(HomingFault::SwitchStuck {
                retreat_steps: outcome.pulses,
            });
        }

        // Verify
        session.transition(HomingPhase::Verify);
        let verify = MotionProfile::constant(
            verify_steps,
            verify_interval,
            kinematics.pulse_width_for(verify_interval),
        );
        let outcome = self.drive(probe, toward, verify, Until::NewContact)?;
        outcome.contact.ok_or(HomingFault::VerificationFailed {
            travel_steps: outcome.pulses,
        })
    }

    fn drive<L, D, C>(
        &self,
        probe: &mut Probe<'_, '_, L, D, C>,
        direction: Direction,
        profile: MotionProfile,
        until: Until,
    ) -> core::result::Result<DriveOutcome, HomingFault>
    where
        L: GpioLines,
        D: DelayNs,
        C: Clock,
    {
        if let Err(e) = probe.start_burst(direction, profile) {
            probe.halt_burst();
            return Err(e.into());
        }
        let result = self.drive_burst(probe, until);
        if result.is_err() {
            probe.halt_burst();
        }
        result
    }

    fn drive_burst<L, D, C>(
        &self,
        probe: &mut Probe<'_, '_, L, D, C>,
        until: Until,
    ) -> core::result::Result<DriveOutcome, HomingFault>
    where
        L: GpioLines,
        D: DelayNs,
        C: Clock,
    {
        let poll = Duration::from_micros(self.config.poll_interval_us as u64);
        let mut watch = InterferenceWatch::new(self.config.max_interference_cycles);
        let mut settle = self.settle_cycles(probe.filter.config());
        let mut outcome = DriveOutcome::default();
        let triggers_before = probe.filter.status().trigger_count;

        loop {
            let status = probe.sample()?;
            if watch.observe(&status)? {
                probe.axis.dwell(poll);
                continue;
            }

            outcome.clear = !status.filtered_state;
            let contact = match until {
                Until::Contact => status.filtered_state,
                Until::NewContact => {
                    status.filtered_state && status.trigger_count > triggers_before
                }
                Until::Release => false,
            };
            if contact {
                probe.halt_burst();
                outcome.contact = Some(probe.axis.position_steps());
                return Ok(outcome);
            }
            if until == Until::Release && outcome.clear && !probe.axis.is_moving() {
                return Ok(outcome);
            }

            if probe.axis.is_moving() {
                probe.poll_burst()?;
                outcome.pulses += 1;
            } else if settle == 0 {
                return Ok(outcome);
            } else {
                // Burst exhausted: give the filter time to confirm what the sensor already sees.
                settle -= 1;
                probe.axis.dwell(poll);
            }
        }
    }

    /// Polls needed for a settled reading to pass the vote ring and the debounce window.
    fn settle_cycles(&self, filter: &FilterConfig) -> u32 {
        let poll_us = self.config.poll_interval_us.max(1) as u64;
        let debounce_polls = (filter.debounce_ms as u64 * 1_000).div_ceil(poll_us);
        (debounce_polls as u32)
            .saturating_add(filter.filter_samples)
            .saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AxisConfig, SensorBinding};
    use crate::hal::sim::{RecordingLines, SimClock};
    use crate::hal::Line;

    fn fast_filter() -> FilterConfig {
        FilterConfig {
            debounce_ms: 2,
            filter_samples: 3,
            interference_threshold: 3,
            interference_window_ms: 50,
        }
    }

    fn rig<F>(sensor: F) -> (StepperAxis<RecordingLines, SimClock>, SensorFilter, SimClock)
    where
        F: FnMut(i64, u64) -> bool + 'static,
    {
        let clock = SimClock::new();
        let lines = RecordingLines::new(Line(5), Line(6))
            .with_clock(clock.clone())
            .with_sensor(Line(20), true, sensor);
        let config = AxisConfig::new(Line(5), Line(6), Line(13), 80.0)
            .with_sensor(SensorBinding::new("x_home", Line(20)).with_filter(fast_filter()));
        let axis = StepperAxis::new("x", config, lines, clock.clone()).unwrap();
        let filter = SensorFilter::new("x_home", fast_filter()).unwrap();
        (axis, filter, clock)
    }

    #[test]
    fn test_settle_cycles() {
        let controller = HomingController::new(HomingConfig::default()).unwrap();
        // 100 ms at 1 ms polls, plus a full ring, plus one.
        assert_eq!(controller.settle_cycles(&FilterConfig::default()), 108);
    }

    #[test]
    fn test_stuck_switch_faults_in_retreat() {
        let (mut axis, mut filter, mut clock) = rig(|_, _| true);
        let controller = HomingController::new(HomingConfig::default()).unwrap();

        let err = controller.home(&mut axis, &mut filter, &mut clock).unwrap_err();

        assert_eq!(err.phase, HomingPhase::Retreat);
        assert!(matches!(err.fault, HomingFault::SwitchStuck { retreat_steps: 400 }));
        assert!(!axis.is_enabled());
        assert!(!axis.is_moving());
    }

    #[test]
    fn test_follower_mirrors_pulses_and_shares_fault() {
        let (mut axis, mut filter, mut clock) = rig(|_, _| true);
        let follower_lines = RecordingLines::new(Line(7), Line(8)).with_clock(clock.clone());
        let mut follower = StepperAxis::new(
            "x2",
            AxisConfig::new(Line(7), Line(8), Line(9), 80.0),
            follower_lines.clone(),
            clock.clone(),
        )
        .unwrap();
        let controller = HomingController::new(HomingConfig::default()).unwrap();

        let err = controller
            .home_group(&mut axis, &mut [&mut follower], &mut filter, &mut clock)
            .unwrap_err();

        assert!(matches!(err.fault, HomingFault::SwitchStuck { .. }));
        assert_eq!(follower.position_steps(), axis.position_steps());
        // Approach pulses toward home, then the full 400-step retreat.
        let approach = 400 - axis.position_steps();
        assert_eq!(follower_lines.rising_edges(Line(7)).len() as i64, approach + 400);
        assert!(!follower.is_enabled());
        assert!(!follower.is_moving());
    }

    #[test]
    fn test_interference_times_out() {
        // Raw level flips on every read.
        let (mut axis, mut filter, mut clock) = rig(|_, read| read % 2 == 0);
        let config = HomingConfig {
            max_interference_cycles: 50,
            ..HomingConfig::default()
        };
        let controller = HomingController::new(config).unwrap();

        let err = controller.home(&mut axis, &mut filter, &mut clock).unwrap_err();

        assert_eq!(err.phase, HomingPhase::Approach);
        assert_eq!(err.fault, HomingFault::InterferenceTimeout { cycles: 51 });
        assert!(!axis.is_moving());
    }

    #[test]
    fn test_axis_without_sensor() {
        let clock = SimClock::new();
        let lines = RecordingLines::new(Line(5), Line(6));
        let mut axis =
            StepperAxis::new("x", AxisConfig::new(Line(5), Line(6), Line(13), 80.0), lines, clock.clone())
                .unwrap();
        let mut filter = SensorFilter::new("x_home", fast_filter()).unwrap();
        let controller = HomingController::new(HomingConfig::default()).unwrap();

        let err = controller.home(&mut axis, &mut filter, &mut clock.clone()).unwrap_err();
        assert_eq!(err.fault, HomingFault::Axis(AxisError::NoSensor));
    }
}

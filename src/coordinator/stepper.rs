//! Simultaneous single-step convergence of several axes.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use heapless::{FnvIndexMap, String, Vec};
use tracing::{debug, warn};

use crate::axis::StepperAxis;
use crate::config::{CoordinationConfig, MAX_AXES};
use crate::error::{AxisError, ConfigError};
use crate::hal::GpioLines;
use crate::motion::Direction;

/// Target position in steps per axis name.
pub type TargetMap = FnvIndexMap<String<32>, i64, MAX_AXES>;

/// Build a [`TargetMap`] from `(axis, steps)` pairs.
///
/// # Errors
///
/// `CapacityExceeded` if a name is too long or there are more than [`MAX_AXES`] entries.
pub fn targets(entries: &[(&str, i64)]) -> Result<TargetMap, ConfigError> {
    let mut map = TargetMap::new();
    for &(name, steps) in entries {
        let key = String::try_from(name).map_err(|_| ConfigError::CapacityExceeded("axis name"))?;
        map.insert(key, steps)
            .map_err(|_| ConfigError::CapacityExceeded("targets"))?;
    }
    Ok(map)
}

/// Result of a bounded convergence loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Convergence {
    /// Ticks issued.
    pub ticks: u32,
    /// Every targeted axis ended within tolerance.
    pub converged: bool,
}

/// Drives several axes toward shared targets, one step per axis per tick.
///
/// Each tick every axis whose remaining delta exceeds the tolerance takes exactly one
/// step toward its target. A follower paired to a leader always takes the leader's
/// target, and because both step in the same tick they stay within one step of each
/// other. Curves are traced by feeding densely sampled waypoints.
pub struct MultiAxisStepper<L, D, T>
where
    L: GpioLines,
    D: DelayNs,
    T: DelayNs,
{
    axes: FnvIndexMap<String<32>, StepperAxis<L, D>, MAX_AXES>,
    /// follower -> leader
    leaders: FnvIndexMap<String<32>, String<32>, MAX_AXES>,
    tick_delay: T,
    tick_delay_us: u32,
    tolerance_steps: u32,
}

impl<L, D, T> MultiAxisStepper<L, D, T>
where
    L: GpioLines,
    D: DelayNs,
    T: DelayNs,
{
    /// Create an empty coordinator with default pacing and a one-step tolerance.
    pub fn new(tick_delay: T) -> Self {
        Self::with_config(tick_delay, &CoordinationConfig::default())
    }

    /// Create an empty coordinator using the pacing and tolerance from `config`.
    ///
    /// Pairs are not applied here; call [`pair`](Self::pair) once the axes are added.
    pub fn with_config(tick_delay: T, config: &CoordinationConfig) -> Self {
        Self {
            axes: FnvIndexMap::new(),
            leaders: FnvIndexMap::new(),
            tick_delay,
            tick_delay_us: config.tick_delay_us,
            tolerance_steps: config.tolerance_steps,
        }
    }

    /// Take ownership of an axis, keyed by its name.
    pub fn add_axis(&mut self, axis: StepperAxis<L, D>) -> Result<(), ConfigError> {
        let key: String<32> =
            String::try_from(axis.name()).map_err(|_| ConfigError::CapacityExceeded("axis name"))?;
        if self.axes.contains_key(&key) {
            return Err(ConfigError::DuplicateAxis(key));
        }
        self.axes
            .insert(key, axis)
            .map_err(|_| ConfigError::CapacityExceeded("axes"))?;
        Ok(())
    }

    /// Make `follower` take `leader`'s target on every tick.
    ///
    /// # Errors
    ///
    /// `InvalidPairing` if either axis is unknown, they are the same axis, the follower
    /// already has a leader, or the pairing would form a chain.
    pub fn pair(&mut self, follower: &str, leader: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidPairing {
            follower: String::try_from(follower).unwrap_or_default(),
            leader: String::try_from(leader).unwrap_or_default(),
        };

        let (Some(f), Some(l)) = (self.key_of(follower), self.key_of(leader)) else {
            return Err(invalid());
        };
        let chained = self.leaders.contains_key(&l) || self.leaders.values().any(|v| *v == f);
        if f == l || self.leaders.contains_key(&f) || chained {
            return Err(invalid());
        }

        debug!(follower, leader, "axes paired");
        self.leaders
            .insert(f, l)
            .map_err(|_| ConfigError::CapacityExceeded("pairs"))?;
        Ok(())
    }

    /// Leader of a paired follower.
    pub fn leader_of(&self, follower: &str) -> Option<&str> {
        self.leaders
            .iter()
            .find(|(f, _)| f.as_str() == follower)
            .map(|(_, l)| l.as_str())
    }

    /// Get an axis by name.
    pub fn axis(&self, name: &str) -> Option<&StepperAxis<L, D>> {
        self.axes
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    /// Get an axis by name, mutably.
    pub fn axis_mut(&mut self, name: &str) -> Option<&mut StepperAxis<L, D>> {
        self.axes
            .iter_mut()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    /// A leader together with every axis paired to it, mutably.
    ///
    /// An unpaired axis comes back with no followers.
    pub fn group_mut(
        &mut self,
        leader: &str,
    ) -> Option<(&mut StepperAxis<L, D>, Vec<&mut StepperAxis<L, D>, MAX_AXES>)> {
        let leaders = &self.leaders;
        let mut head = None;
        let mut followers = Vec::new();
        for (name, axis) in self.axes.iter_mut() {
            if name.as_str() == leader {
                head = Some(axis);
            } else if leaders.get(name).is_some_and(|l| l.as_str() == leader) {
                // Same capacity as `axes`.
                let _ = followers.push(axis);
            }
        }
        head.map(|axis| (axis, followers))
    }

    /// Registered axis names, in insertion order.
    pub fn axis_names(&self) -> impl Iterator<Item = &str> {
        self.axes.keys().map(|k| k.as_str())
    }

    /// All axes, mutably.
    pub fn axes_mut(&mut self) -> impl Iterator<Item = &mut StepperAxis<L, D>> {
        self.axes.values_mut()
    }

    /// Number of axes.
    #[inline]
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    /// No axes registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Current position of every axis.
    pub fn positions(&self) -> TargetMap {
        let mut map = TargetMap::new();
        for (name, axis) in self.axes.iter() {
            // Same capacity as `axes`.
            let _ = map.insert(name.clone(), axis.position_steps());
        }
        map
    }

    /// `position(a) - position(b)`, if both axes exist.
    pub fn divergence(&self, a: &str, b: &str) -> Option<i64> {
        Some(self.axis(a)?.position_steps() - self.axis(b)?.position_steps())
    }

    /// Issue one tick toward `targets`.
    ///
    /// Axes without a target (directly or through their leader) hold still. Returns
    /// `true` once every targeted axis is within tolerance.
    ///
    /// # Errors
    ///
    /// The first axis error aborts the tick; axes already stepped keep their step.
    pub fn advance_toward(&mut self, targets: &TargetMap) -> Result<bool, AxisError> {
        for name in targets.keys() {
            if !self.axes.contains_key(name) {
                warn!(axis = name.as_str(), "target for unknown axis ignored");
            }
        }

        let tolerance = self.tolerance_steps as u64;
        let mut stepped = false;
        let mut arrived = true;

        for (name, axis) in self.axes.iter_mut() {
            let Some(target) = resolve_target(&self.leaders, targets, name) else {
                continue;
            };

            let delta = target - axis.position_steps();
            if delta.unsigned_abs() <= tolerance {
                continue;
            }

            let direction = Direction::from_delta(delta);
            let pulse_width = axis.pulse_width();
            axis.step(direction, 1, Duration::ZERO, pulse_width)?;
            stepped = true;

            if (delta - direction.sign()).unsigned_abs() > tolerance {
                arrived = false;
            }
        }

        if stepped {
            self.tick_delay.delay_us(self.tick_delay_us);
        }
        Ok(arrived)
    }

    /// Tick until every targeted axis is within tolerance or `max_ticks` have run.
    pub fn move_to(&mut self, targets: &TargetMap, max_ticks: u32) -> Result<Convergence, AxisError> {
        let mut ticks = 0;
        if self.within_tolerance(targets) {
            return Ok(Convergence { ticks, converged: true });
        }

        while ticks < max_ticks {
            ticks += 1;
            if self.advance_toward(targets)? {
                return Ok(Convergence { ticks, converged: true });
            }
        }

        warn!(ticks, "targets not reached within tick bound");
        Ok(Convergence { ticks, converged: false })
    }

    /// Visit `waypoints` in order, giving each at most `max_ticks_per_waypoint` ticks.
    ///
    /// Stops at the first waypoint that does not converge.
    pub fn follow_path(
        &mut self,
        waypoints: &[TargetMap],
        max_ticks_per_waypoint: u32,
    ) -> Result<Convergence, AxisError> {
        let mut total = 0;
        for (index, waypoint) in waypoints.iter().enumerate() {
            let step = self.move_to(waypoint, max_ticks_per_waypoint)?;
            total += step.ticks;
            if !step.converged {
                warn!(waypoint = index, "path aborted at unreachable waypoint");
                return Ok(Convergence {
                    ticks: total,
                    converged: false,
                });
            }
        }
        debug!(waypoints = waypoints.len(), ticks = total, "path complete");
        Ok(Convergence {
            ticks: total,
            converged: true,
        })
    }

    fn within_tolerance(&self, targets: &TargetMap) -> bool {
        let tolerance = self.tolerance_steps as u64;
        self.axes.iter().all(|(name, axis)| {
            resolve_target(&self.leaders, targets, name)
                .map_or(true, |t| (t - axis.position_steps()).unsigned_abs() <= tolerance)
        })
    }

    fn key_of(&self, name: &str) -> Option<String<32>> {
        self.axes.keys().find(|k| k.as_str() == name).cloned()
    }
}

/// A follower takes its leader's target when the leader has one, else its own.
fn resolve_target(
    leaders: &FnvIndexMap<String<32>, String<32>, MAX_AXES>,
    targets: &TargetMap,
    name: &String<32>,
) -> Option<i64> {
    leaders
        .get(name)
        .and_then(|leader| targets.get(leader))
        .or_else(|| targets.get(name))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AxisConfig;
    use crate::hal::sim::{RecordingLines, SimClock};
    use crate::hal::Line;

    type Sim = MultiAxisStepper<RecordingLines, SimClock, SimClock>;

    fn stepper(names: &[&str]) -> (Sim, SimClock) {
        let clock = SimClock::new();
        let mut coordinator = MultiAxisStepper::new(clock.clone());
        for (i, name) in names.iter().enumerate() {
            let base = (i as u8) * 3;
            let lines = RecordingLines::new(Line(base), Line(base + 1));
            let config = AxisConfig::new(Line(base), Line(base + 1), Line(base + 2), 80.0);
            let axis = StepperAxis::new(name, config, lines, clock.clone()).unwrap();
            coordinator.add_axis(axis).unwrap();
        }
        (coordinator, clock)
    }

    #[test]
    fn test_single_tick_steps_each_axis_once() {
        let (mut coordinator, clock) = stepper(&["x", "y"]);
        let goal = targets(&[("x", 5), ("y", -5)]).unwrap();

        assert!(!coordinator.advance_toward(&goal).unwrap());
        assert_eq!(coordinator.axis("x").unwrap().position_steps(), 1);
        assert_eq!(coordinator.axis("y").unwrap().position_steps(), -1);
        // One tick delay (250 µs) plus two DIR setups and two pulses.
        assert_eq!(clock.elapsed_ns(), 250_000 + 4 * 5_000);
    }

    #[test]
    fn test_within_tolerance_holds_still() {
        let (mut coordinator, clock) = stepper(&["x"]);
        let goal = targets(&[("x", 1)]).unwrap();

        assert!(coordinator.advance_toward(&goal).unwrap());
        assert_eq!(coordinator.axis("x").unwrap().position_steps(), 0);
        assert_eq!(clock.elapsed_ns(), 0);
    }

    #[test]
    fn test_move_to_reports_tick_bound() {
        let (mut coordinator, _) = stepper(&["x"]);
        let goal = targets(&[("x", 50)]).unwrap();

        let result = coordinator.move_to(&goal, 10).unwrap();
        assert_eq!(result, Convergence { ticks: 10, converged: false });

        let result = coordinator.move_to(&goal, 100).unwrap();
        assert!(result.converged);
        assert_eq!(coordinator.axis("x").unwrap().position_steps(), 49);
    }

    #[test]
    fn test_pairing_rules() {
        let (mut coordinator, _) = stepper(&["x", "x2", "y"]);

        assert!(coordinator.pair("x2", "x2").is_err());
        assert!(coordinator.pair("x2", "z").is_err());
        coordinator.pair("x2", "x").unwrap();
        assert!(coordinator.pair("x2", "y").is_err());
        assert!(coordinator.pair("y", "x2").is_err());
        assert!(coordinator.pair("x", "y").is_err());
        assert_eq!(coordinator.leader_of("x2"), Some("x"));
    }

    #[test]
    fn test_group_collects_followers() {
        let (mut coordinator, _) = stepper(&["x", "x2", "y", "x3"]);
        coordinator.pair("x2", "x").unwrap();
        coordinator.pair("x3", "x").unwrap();

        {
            let (leader, followers) = coordinator.group_mut("x").unwrap();
            assert_eq!(leader.name(), "x");
            let names: std::vec::Vec<_> = followers.iter().map(|f| f.name()).collect();
            assert_eq!(names, ["x2", "x3"]);
        }

        {
            let (_, followers) = coordinator.group_mut("y").unwrap();
            assert!(followers.is_empty());
        }
        assert!(coordinator.group_mut("z").is_none());
    }

    #[test]
    fn test_duplicate_axis_rejected() {
        let (mut coordinator, clock) = stepper(&["x"]);
        let lines = RecordingLines::new(Line(20), Line(21));
        let axis = StepperAxis::new(
            "x",
            AxisConfig::new(Line(20), Line(21), Line(22), 80.0),
            lines,
            clock,
        )
        .unwrap();

        assert!(matches!(coordinator.add_axis(axis), Err(ConfigError::DuplicateAxis(_))));
        assert_eq!(coordinator.len(), 1);
    }
}

//! Simulated hardware for deterministic, sleep-free tests and demos.
//!
//! [`RecordingLines`] keeps every write in memory and moves a virtual carriage one
//! step per rising edge on the step line. The sensor is a closure over the carriage
//! position, so tests can place a switch anywhere or inject noise. [`SimClock`]
//! advances virtual time whenever a delay is requested.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;

use super::{Clock, GpioLines, Line, LineMode, Timestamp};
use crate::error::LineOp;

/// Virtual time shared by every clone.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now_ns: Rc<Cell<u64>>,
}

impl SimClock {
    /// Start at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Nanoseconds elapsed since creation.
    pub fn elapsed_ns(&self) -> u64 {
        self.now_ns.get()
    }

    /// Move time forward without a delay call.
    pub fn advance_ns(&self, ns: u64) {
        self.now_ns.set(self.now_ns.get() + ns);
    }
}

impl DelayNs for SimClock {
    fn delay_ns(&mut self, ns: u32) {
        self.advance_ns(ns as u64);
    }
}

impl Clock for SimClock {
    fn now(&mut self) -> Timestamp {
        Timestamp::from_micros(self.now_ns.get() / 1_000)
    }
}

/// One recorded line write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEvent {
    /// Line written
    pub line: Line,
    /// Electrical level
    pub high: bool,
    /// Virtual time of the write
    pub at_ns: u64,
}

/// Error returned by [`RecordingLines`] when a fault is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectedFault {
    /// Line that failed
    pub line: Line,
    /// Operation that failed
    pub op: LineOp,
}

type SensorFn = Box<dyn FnMut(i64, u64) -> bool>;

struct SimSensor {
    line: Line,
    active_low: bool,
    actuated: SensorFn,
}

struct SimState {
    step_line: Line,
    dir_line: Line,
    modes: BTreeMap<Line, LineMode>,
    levels: BTreeMap<Line, bool>,
    events: Vec<LineEvent>,
    carriage: i64,
    reads: u64,
    sensor: Option<SimSensor>,
    clock: Option<SimClock>,
    fail: Option<InjectedFault>,
    released: Vec<Line>,
}

/// In-memory [`GpioLines`] with a simulated carriage.
///
/// Clones share state, so a test can keep a probe after handing the lines to an axis.
#[derive(Clone)]
pub struct RecordingLines {
    state: Rc<RefCell<SimState>>,
}

impl RecordingLines {
    /// Track a carriage driven by `step_line` / `dir_line` (dir high = +1 per step).
    pub fn new(step_line: Line, dir_line: Line) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState {
                step_line,
                dir_line,
                modes: BTreeMap::new(),
                levels: BTreeMap::new(),
                events: Vec::new(),
                carriage: 0,
                reads: 0,
                sensor: None,
                clock: None,
                fail: None,
                released: Vec::new(),
            })),
        }
    }

    /// Stamp events with virtual time from `clock`.
    pub fn with_clock(self, clock: SimClock) -> Self {
        self.state.borrow_mut().clock = Some(clock);
        self
    }

    /// Attach a sensor on `line`.
    ///
    /// `actuated(carriage_steps, read_index)` says whether the sensor is physically
    /// actuated; the recorder turns that into the electrical level using `active_low`.
    pub fn with_sensor<F>(self, line: Line, active_low: bool, actuated: F) -> Self
    where
        F: FnMut(i64, u64) -> bool + 'static,
    {
        self.state.borrow_mut().sensor = Some(SimSensor {
            line,
            active_low,
            actuated: Box::new(actuated),
        });
        self
    }

    /// Make every `op` on `line` fail from now on.
    pub fn fail_on(&self, line: Line, op: LineOp) {
        self.state.borrow_mut().fail = Some(InjectedFault { line, op });
    }

    /// Stop injecting faults.
    pub fn heal(&self) {
        self.state.borrow_mut().fail = None;
    }

    /// Electrical carriage position in steps.
    pub fn carriage_steps(&self) -> i64 {
        self.state.borrow().carriage
    }

    /// Move the carriage without stepping (e.g. power-on position).
    pub fn place_carriage(&self, steps: i64) {
        self.state.borrow_mut().carriage = steps;
    }

    /// Last level written to `line`.
    pub fn level(&self, line: Line) -> Option<bool> {
        self.state.borrow().levels.get(&line).copied()
    }

    /// Mode set for `line`.
    pub fn mode(&self, line: Line) -> Option<LineMode> {
        self.state.borrow().modes.get(&line).copied()
    }

    /// Copy of every write so far.
    pub fn events(&self) -> Vec<LineEvent> {
        self.state.borrow().events.clone()
    }

    /// Virtual times of rising edges on `line`.
    pub fn rising_edges(&self, line: Line) -> Vec<u64> {
        let state = self.state.borrow();
        let mut last = false;
        let mut edges = Vec::new();
        for event in state.events.iter().filter(|e| e.line == line) {
            if event.high && !last {
                edges.push(event.at_ns);
            }
            last = event.high;
        }
        edges
    }

    /// Lines passed to `cleanup`.
    pub fn released(&self) -> Vec<Line> {
        self.state.borrow().released.clone()
    }

    /// Number of sensor reads so far.
    pub fn reads(&self) -> u64 {
        self.state.borrow().reads
    }

    fn check(state: &SimState, line: Line, op: LineOp) -> Result<(), InjectedFault> {
        match state.fail {
            Some(fault) if fault.line == line && fault.op == op => Err(fault),
            _ => Ok(()),
        }
    }
}

impl GpioLines for RecordingLines {
    type Error = InjectedFault;

    fn setup(&mut self, line: Line, mode: LineMode) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        Self::check(&state, line, LineOp::Setup)?;
        state.modes.insert(line, mode);
        Ok(())
    }

    fn write(&mut self, line: Line, high: bool) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        Self::check(&state, line, LineOp::Write)?;

        let was_high = state.levels.get(&line).copied().unwrap_or(false);
        if line == state.step_line && high && !was_high {
            let forward = state.levels.get(&state.dir_line).copied().unwrap_or(false);
            state.carriage += if forward { 1 } else { -1 };
        }

        let at_ns = state.clock.as_ref().map(SimClock::elapsed_ns).unwrap_or(0);
        state.levels.insert(line, high);
        state.events.push(LineEvent { line, high, at_ns });
        Ok(())
    }

    fn read(&mut self, line: Line) -> Result<bool, Self::Error> {
        let mut state = self.state.borrow_mut();
        Self::check(&state, line, LineOp::Read)?;

        let carriage = state.carriage;
        let index = state.reads;
        state.reads += 1;

        if let Some(sensor) = state.sensor.as_mut().filter(|s| s.line == line) {
            let actuated = (sensor.actuated)(carriage, index);
            return Ok(actuated != sensor.active_low);
        }
        Ok(state.levels.get(&line).copied().unwrap_or(false))
    }

    fn cleanup(&mut self, lines: &[Line]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        for &line in lines {
            Self::check(&state, line, LineOp::Cleanup)?;
        }
        state.released.extend_from_slice(lines);
        Ok(())
    }
}

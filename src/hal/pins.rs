//! [`GpioLines`] over embedded-hal 1.0 pins.

use core::convert::Infallible;

use embedded_hal::digital::{Error as _, ErrorKind, ErrorType, InputPin, OutputPin};

use super::{GpioLines, Line, LineMode};

/// Error returned by [`PinLines`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLinesError {
    /// The line is not wired to any pin of this axis.
    UnknownLine(Line),
    /// The line exists but cannot be used this way (e.g. reading an output).
    WrongMode(Line),
    /// The pin driver reported an error.
    Pin {
        /// Line being accessed
        line: Line,
        /// Driver error kind
        kind: ErrorKind,
    },
}

/// Placeholder input for axes without a sensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl InputPin for NoPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// The step, direction and enable outputs of one axis plus an optional sensor input.
///
/// Pin mode is fixed by the pin types themselves, so `setup` only checks that the
/// requested line is wired and that its direction matches.
pub struct PinLines<STEP, DIR, EN, SENSE = NoPin> {
    step: (Line, STEP),
    dir: (Line, DIR),
    enable: (Line, EN),
    sensor: Option<(Line, SENSE)>,
}

impl<STEP, DIR, EN> PinLines<STEP, DIR, EN, NoPin>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
{
    /// Wire the three output lines of an axis.
    pub fn new(step: (Line, STEP), dir: (Line, DIR), enable: (Line, EN)) -> Self {
        Self {
            step,
            dir,
            enable,
            sensor: None,
        }
    }

    /// Attach a sensor input.
    pub fn with_sensor<SENSE: InputPin>(
        self,
        line: Line,
        pin: SENSE,
    ) -> PinLines<STEP, DIR, EN, SENSE> {
        PinLines {
            step: self.step,
            dir: self.dir,
            enable: self.enable,
            sensor: Some((line, pin)),
        }
    }
}

impl<STEP, DIR, EN, SENSE> PinLines<STEP, DIR, EN, SENSE> {
    /// Give the pins back.
    pub fn release(self) -> (STEP, DIR, EN, Option<SENSE>) {
        (self.step.1, self.dir.1, self.enable.1, self.sensor.map(|(_, pin)| pin))
    }

    fn is_output(&self, line: Line) -> bool {
        line == self.step.0 || line == self.dir.0 || line == self.enable.0
    }

    fn is_input(&self, line: Line) -> bool {
        self.sensor.as_ref().is_some_and(|(l, _)| *l == line)
    }
}

fn drive<P: OutputPin>(line: Line, pin: &mut P, high: bool) -> Result<(), PinLinesError> {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.map_err(|e| PinLinesError::Pin { line, kind: e.kind() })
}

impl<STEP, DIR, EN, SENSE> GpioLines for PinLines<STEP, DIR, EN, SENSE>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    SENSE: InputPin,
{
    type Error = PinLinesError;

    fn setup(&mut self, line: Line, mode: LineMode) -> Result<(), Self::Error> {
        match mode {
            LineMode::Output if self.is_output(line) => Ok(()),
            LineMode::Input | LineMode::InputPullUp if self.is_input(line) => Ok(()),
            _ if self.is_output(line) || self.is_input(line) => Err(PinLinesError::WrongMode(line)),
            _ => Err(PinLinesError::UnknownLine(line)),
        }
    }

    fn write(&mut self, line: Line, high: bool) -> Result<(), Self::Error> {
        if line == self.step.0 {
            drive(line, &mut self.step.1, high)
        } else if line == self.dir.0 {
            drive(line, &mut self.dir.1, high)
        } else if line == self.enable.0 {
            drive(line, &mut self.enable.1, high)
        } else if self.is_input(line) {
            Err(PinLinesError::WrongMode(line))
        } else {
            Err(PinLinesError::UnknownLine(line))
        }
    }

    fn read(&mut self, line: Line) -> Result<bool, Self::Error> {
        if let Some((l, pin)) = self.sensor.as_mut() {
            if *l == line {
                return pin
                    .is_high()
                    .map_err(|e| PinLinesError::Pin { line, kind: e.kind() });
            }
        }
        if self.is_output(line) {
            Err(PinLinesError::WrongMode(line))
        } else {
            Err(PinLinesError::UnknownLine(line))
        }
    }

    fn cleanup(&mut self, lines: &[Line]) -> Result<(), Self::Error> {
        // Pins stay owned by us; parking step and dir low is all there is to release.
        for &line in lines {
            if line == self.step.0 {
                drive(line, &mut self.step.1, false)?;
            } else if line == self.dir.0 {
                drive(line, &mut self.dir.1, false)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};

    #[test]
    fn test_write_routes_to_matching_pin() {
        let step = PinMock::new(&[
            PinTransaction::set(State::High),
            PinTransaction::set(State::Low),
        ]);
        let dir = PinMock::new(&[PinTransaction::set(State::High)]);
        let enable = PinMock::new(&[PinTransaction::set(State::Low)]);

        let mut lines = PinLines::new((Line(5), step), (Line(6), dir), (Line(13), enable));

        lines.write(Line(6), true).unwrap();
        lines.write(Line(13), false).unwrap();
        lines.write(Line(5), true).unwrap();
        lines.write(Line(5), false).unwrap();
        assert_eq!(lines.write(Line(99), true), Err(PinLinesError::UnknownLine(Line(99))));

        let (mut step, mut dir, mut enable, _) = lines.release();
        step.done();
        dir.done();
        enable.done();
    }

    #[test]
    fn test_sensor_read_and_modes() {
        let step = PinMock::new(&[]);
        let dir = PinMock::new(&[]);
        let enable = PinMock::new(&[]);
        let sense = PinMock::new(&[
            PinTransaction::get(State::Low),
            PinTransaction::get(State::High),
        ]);

        let mut lines = PinLines::new((Line(5), step), (Line(6), dir), (Line(13), enable))
            .with_sensor(Line(20), sense);

        lines.setup(Line(20), LineMode::InputPullUp).unwrap();
        lines.setup(Line(5), LineMode::Output).unwrap();
        assert_eq!(
            lines.setup(Line(20), LineMode::Output),
            Err(PinLinesError::WrongMode(Line(20)))
        );
        assert_eq!(lines.read(Line(5)), Err(PinLinesError::WrongMode(Line(5))));

        assert!(!lines.read(Line(20)).unwrap());
        assert!(lines.read(Line(20)).unwrap());

        let (mut step, mut dir, mut enable, sense) = lines.release();
        step.done();
        dir.done();
        enable.done();
        sense.unwrap().done();
    }

    #[test]
    fn test_cleanup_parks_step_and_dir_low() {
        let step = PinMock::new(&[PinTransaction::set(State::Low)]);
        let dir = PinMock::new(&[PinTransaction::set(State::Low)]);
        let enable = PinMock::new(&[]);

        let mut lines = PinLines::new((Line(5), step), (Line(6), dir), (Line(13), enable));
        lines.cleanup(&[Line(5), Line(6), Line(13)]).unwrap();

        let (mut step, mut dir, mut enable, _) = lines.release();
        step.done();
        dir.done();
        enable.done();
    }
}

//! Builder pattern for StepperAxis.

use embedded_hal::delay::DelayNs;
use heapless::String;

use crate::config::{AxisConfig, GantryConfig, SensorBinding};
use crate::error::{ConfigError, Error, Result};
use crate::hal::{EmergencyStop, GpioLines, Line};

use super::driver::StepperAxis;

/// Builder for creating StepperAxis instances.
pub struct StepperAxisBuilder<L, D>
where
    L: GpioLines,
    D: DelayNs,
{
    lines: Option<L>,
    delay: Option<D>,
    name: Option<String<32>>,
    step_line: Option<Line>,
    dir_line: Option<Line>,
    enable_line: Option<Line>,
    steps_per_mm: Option<f64>,
    direction_inverted: bool,
    pulse_width_us: Option<u32>,
    enable_active_low: bool,
    sensor: Option<SensorBinding>,
    stop: Option<EmergencyStop>,
}

impl<L, D> Default for StepperAxisBuilder<L, D>
where
    L: GpioLines,
    D: DelayNs,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<L, D> StepperAxisBuilder<L, D>
where
    L: GpioLines,
    D: DelayNs,
{
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            lines: None,
            delay: None,
            name: None,
            step_line: None,
            dir_line: None,
            enable_line: None,
            steps_per_mm: None,
            direction_inverted: false,
            pulse_width_us: None,
            enable_active_low: true,
            sensor: None,
            stop: None,
        }
    }

    /// Set the line capability.
    pub fn lines(mut self, lines: L) -> Self {
        self.lines = Some(lines);
        self
    }

    /// Set the delay provider.
    pub fn delay(mut self, delay: D) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set the axis name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = String::try_from(name).ok();
        self
    }

    /// Set the STEP, DIR and enable lines.
    pub fn step_dir_enable(mut self, step: Line, dir: Line, enable: Line) -> Self {
        self.step_line = Some(step);
        self.dir_line = Some(dir);
        self.enable_line = Some(enable);
        self
    }

    /// Set steps per millimetre.
    pub fn steps_per_mm(mut self, steps_per_mm: f64) -> Self {
        self.steps_per_mm = Some(steps_per_mm);
        self
    }

    /// Set direction inversion.
    pub fn direction_inverted(mut self, inverted: bool) -> Self {
        self.direction_inverted = inverted;
        self
    }

    /// Set the STEP high time in microseconds.
    pub fn pulse_width_us(mut self, us: u32) -> Self {
        self.pulse_width_us = Some(us);
        self
    }

    /// Enable line polarity (default: active low).
    pub fn enable_active_low(mut self, active_low: bool) -> Self {
        self.enable_active_low = active_low;
        self
    }

    /// Bind a sensor.
    pub fn sensor(mut self, sensor: SensorBinding) -> Self {
        self.sensor = Some(sensor);
        self
    }

    /// Check this stop flag before every pulse.
    pub fn emergency_stop(mut self, stop: EmergencyStop) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Configure from an AxisConfig.
    pub fn from_axis_config(mut self, config: &AxisConfig) -> Self {
        self.step_line = Some(config.step_line);
        self.dir_line = Some(config.dir_line);
        self.enable_line = Some(config.enable_line);
        self.steps_per_mm = Some(config.steps_per_mm);
        self.direction_inverted = config.direction_inverted;
        self.pulse_width_us = Some(config.pulse_width_us);
        self.enable_active_low = config.enable_active_low;
        self.sensor = config.sensor.clone();
        self
    }

    /// Configure from GantryConfig by axis name.
    pub fn from_config(self, config: &GantryConfig, axis_name: &str) -> Result<Self> {
        let axis_config = config.axis(axis_name).ok_or_else(|| {
            Error::Config(ConfigError::AxisNotFound(
                String::try_from(axis_name).unwrap_or_default(),
            ))
        })?;

        Ok(self.name(axis_name).from_axis_config(axis_config))
    }

    /// Build the StepperAxis.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or the resulting configuration
    /// is invalid.
    pub fn build(self) -> Result<StepperAxis<L, D>> {
        let lines = self.lines.ok_or_else(|| missing("lines are required"))?;
        let delay = self.delay.ok_or_else(|| missing("delay is required"))?;
        let step_line = self.step_line.ok_or_else(|| missing("step line is required"))?;
        let dir_line = self.dir_line.ok_or_else(|| missing("dir line is required"))?;
        let enable_line = self.enable_line.ok_or_else(|| missing("enable line is required"))?;
        let steps_per_mm = self.steps_per_mm.ok_or_else(|| missing("steps_per_mm is required"))?;

        let mut config = AxisConfig::new(step_line, dir_line, enable_line, steps_per_mm);
        config.direction_inverted = self.direction_inverted;
        config.enable_active_low = self.enable_active_low;
        config.sensor = self.sensor;
        if let Some(us) = self.pulse_width_us {
            config.pulse_width_us = us;
        }

        let name = self.name.as_ref().map_or("axis", |n| n.as_str());
        let mut axis = StepperAxis::new(name, config, lines, delay)?;
        if let Some(stop) = self.stop {
            axis.set_emergency_stop(stop);
        }
        Ok(axis)
    }
}

fn missing(msg: &str) -> Error {
    Error::Config(ConfigError::ParseError(String::try_from(msg).unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::{RecordingLines, SimClock};

    #[test]
    fn test_builder_requires_lines() {
        let result = StepperAxisBuilder::<RecordingLines, SimClock>::new()
            .delay(SimClock::new())
            .step_dir_enable(Line(5), Line(6), Line(13))
            .steps_per_mm(80.0)
            .build();
        assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
    }

    #[test]
    fn test_builder_from_config() {
        let mut config = GantryConfig::default();
        config
            .axes
            .insert(
                String::try_from("x").unwrap(),
                AxisConfig::new(Line(5), Line(6), Line(13), 80.0).inverted(true),
            )
            .unwrap();

        let axis = StepperAxisBuilder::new()
            .from_config(&config, "x")
            .unwrap()
            .lines(RecordingLines::new(Line(5), Line(6)))
            .delay(SimClock::new())
            .emergency_stop(EmergencyStop::new())
            .build()
            .unwrap();

        assert_eq!(axis.name(), "x");
        assert!(axis.config().direction_inverted);

        let missing = StepperAxisBuilder::<RecordingLines, SimClock>::new().from_config(&config, "z");
        assert!(matches!(missing, Err(Error::Config(ConfigError::AxisNotFound(_)))));
    }
}

//! Debounce, majority vote and interference classification for one sensor line.

use core::time::Duration;

use heapless::{Deque, String};
use tracing::{debug, info, warn};

use crate::config::FilterConfig;
use crate::error::ConfigError;
use crate::hal::Timestamp;

use super::status::SensorStatus;

/// Ring capacity; `filter_samples` may not exceed it.
pub const MAX_FILTER_SAMPLES: usize = 32;

/// Rising-edge history capacity; `interference_threshold` may not exceed it.
pub const MAX_INTERFERENCE_THRESHOLD: usize = 32;

/// Conditions one raw digital line into a debounced, EMI-aware state.
///
/// The filter owns all of its state and is fed by [`sample`](Self::sample); it never
/// reads hardware or clocks on its own.
#[derive(Debug, Clone)]
pub struct SensorFilter {
    name: String<32>,
    config: FilterConfig,

    /// Last `filter_samples` raw readings.
    ring: Deque<bool, MAX_FILTER_SAMPLES>,
    raw_state: bool,

    /// Reported state.
    filtered: bool,
    /// When the vote first disagreed with `filtered`.
    pending_since: Option<Timestamp>,

    /// Raw rising edges inside the detection window.
    edges: Deque<Timestamp, MAX_INTERFERENCE_THRESHOLD>,
    interference: bool,
    /// Last sample that saw the edge rate at or above threshold.
    last_burst: Option<Timestamp>,

    trigger_count: u32,
}

impl SensorFilter {
    /// Create a filter.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any parameter is out of range.
    pub fn new(name: &str, config: FilterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let name = String::try_from(name).map_err(|_| ConfigError::CapacityExceeded("sensor name"))?;

        Ok(Self {
            name,
            config,
            ring: Deque::new(),
            raw_state: false,
            filtered: false,
            pending_since: None,
            edges: Deque::new(),
            interference: false,
            last_burst: None,
            trigger_count: 0,
        })
    }

    /// Change the filter parameters; the interference window is kept.
    ///
    /// Sample history restarts, so the state reads "not triggered" until the ring refills.
    pub fn configure(
        &mut self,
        debounce_ms: u32,
        filter_samples: u32,
        interference_threshold: u32,
    ) -> Result<(), ConfigError> {
        let config = FilterConfig {
            debounce_ms,
            filter_samples,
            interference_threshold,
            ..self.config
        };
        config.validate()?;

        self.config = config;
        self.ring.clear();
        self.filtered = false;
        self.pending_since = None;
        self.edges.clear();
        self.interference = false;
        self.last_burst = None;
        Ok(())
    }

    /// Feed one raw reading taken at `now`.
    pub fn sample(&mut self, raw: bool, now: Timestamp) -> SensorStatus {
        let samples = self.config.filter_samples as usize;
        if self.ring.len() >= samples {
            self.ring.pop_front();
        }
        // Capacity is checked by `FilterConfig::validate`.
        let _ = self.ring.push_back(raw);

        if raw && !self.raw_state {
            if self.edges.is_full() {
                self.edges.pop_front();
            }
            let _ = self.edges.push_back(now);
        }
        self.raw_state = raw;

        self.classify_interference(now);

        if !self.interference {
            self.debounce(now);
        }

        self.status()
    }

    fn classify_interference(&mut self, now: Timestamp) {
        let window = Duration::from_millis(self.config.interference_window_ms as u64);

        while let Some(&oldest) = self.edges.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.edges.pop_front();
            } else {
                break;
            }
        }

        if self.edges.len() >= self.config.interference_threshold as usize {
            if !self.interference {
                warn!(
                    sensor = self.name.as_str(),
                    edges = self.edges.len(),
                    "interference detected, holding filtered state"
                );
                self.interference = true;
                self.pending_since = None;
            }
            self.last_burst = Some(now);
        } else if self.interference {
            let quiet = self
                .last_burst
                .map_or(true, |t| now.saturating_duration_since(t) >= window);
            if quiet {
                info!(sensor = self.name.as_str(), "interference cleared");
                self.interference = false;
            }
        }
    }

    fn debounce(&mut self, now: Timestamp) {
        let voted = self.vote();
        if voted == self.filtered {
            self.pending_since = None;
            return;
        }

        let since = *self.pending_since.get_or_insert(now);
        let debounce = Duration::from_millis(self.config.debounce_ms as u64);
        if now.saturating_duration_since(since) >= debounce {
            self.filtered = voted;
            self.pending_since = None;
            if voted {
                self.trigger_count = self.trigger_count.saturating_add(1);
            }
            debug!(sensor = self.name.as_str(), triggered = voted, "filtered state changed");
        }
    }

    /// Majority over a full ring; ties and partial rings read as not triggered.
    fn vote(&self) -> bool {
        let samples = self.config.filter_samples as usize;
        if self.ring.len() < samples {
            return false;
        }
        let high = self.ring.iter().filter(|&&s| s).count();
        high * 2 > samples
    }

    /// Clear the trigger count and interference flag.
    pub fn reset(&mut self) {
        self.trigger_count = 0;
        self.interference = false;
        self.edges.clear();
        self.last_burst = None;
    }

    /// Snapshot of the current state.
    pub fn status(&self) -> SensorStatus {
        SensorStatus {
            name: self.name.clone(),
            raw_state: self.raw_state,
            filtered_state: self.filtered,
            interference_detected: self.interference,
            trigger_count: self.trigger_count,
            history_samples: self.ring.len() as u32,
        }
    }

    /// Sensor name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Active parameters.
    #[inline]
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Reported (filtered) state.
    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.filtered
    }
}

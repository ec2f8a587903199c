//! Shared status board for operator tooling.

use std::sync::{Arc, Mutex, PoisonError};

use super::status::{SensorStatus, SensorStatusMap};

/// Latest [`SensorStatus`] per sensor, readable from any thread.
///
/// Writers publish after each sample; readers get a copy, so a status query never
/// holds the lock across motion.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<Mutex<SensorStatusMap>>,
}

impl StatusBoard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the latest status of one sensor.
    ///
    /// Returns `false` if the board is full and the sensor is new.
    pub fn publish(&self, status: &SensorStatus) -> bool {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(status.name.clone(), status.clone()).is_ok()
    }

    /// Copy of all published statuses.
    pub fn snapshot(&self) -> SensorStatusMap {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Latest status of one sensor.
    pub fn get(&self, name: &str) -> Option<SensorStatus> {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v.clone())
    }
}

//! Sensor subsystem: acquisition drivers, reading cache, polling engine.
//!
//! | Sensor  | Acquisition                        | Cadence                  |
//! |---------|------------------------------------|--------------------------|
//! | DHT11   | single-wire 40-bit timing protocol | 5 s after 2 s stabilise  |
//! | MQ-2    | averaged ADC, resistance → ppm     | 5 s after heater preheat |
//!
//! Drivers are pure over the port traits in [`crate::app::ports`] so the
//! whole acquisition path runs on the host against simulated lines.

pub mod dht11;
pub mod mq2;
pub mod polling;

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// One successful acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading<T> {
    pub value: T,
    pub captured_at: Instant,
    /// Always `true` for a stored reading; a failed acquisition is never
    /// stored, so the cache holds the last good value instead.
    pub valid: bool,
}

/// Last good reading of one sensor.
///
/// Written only by that sensor's poller; read by anyone. A failed
/// acquisition leaves the previous reading in place.
pub struct SensorCache<T> {
    slot: Mutex<Option<SensorReading<T>>>,
}

impl<T: Copy> SensorCache<T> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn store(&self, value: T) -> SensorReading<T> {
        let reading = SensorReading {
            value,
            captured_at: Instant::now(),
            valid: true,
        };
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(reading);
        reading
    }

    pub fn latest(&self) -> Option<SensorReading<T>> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Value of the last valid reading.
    pub fn value(&self) -> Option<T> {
        self.latest().filter(|r| r.valid).map(|r| r.value)
    }
}

impl<T: Copy> Default for SensorCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

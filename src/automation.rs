//! Automation bridge: smoke alert drives the fan and the lamp.
//!
//! Edge-triggered: only a `false → true` transition of the MQ-2 alert
//! fires. A sustained alert fires once; it re-arms after the alert clears.
//!
//! ## Safety override
//!
//! The response calls [`Fan::set_level`] and [`Lamp::turn_on`] directly
//! from the sensor task. Both are internally synchronised instantaneous
//! operations, so the response is never rejected as busy and never
//! touches hardware outside the actuator's own lock. The curtain is left
//! alone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, warn};

use crate::actuators::fan::{Fan, MAX_LEVEL};
use crate::actuators::lamp::Lamp;
use crate::app::events::DeviceEvent;
use crate::app::ports::EventSink;

/// Rising-edge detector over successive alert samples.
#[derive(Debug, Default)]
pub struct AlertEdge {
    previous: AtomicBool,
}

impl AlertEdge {
    pub const fn new() -> Self {
        Self {
            previous: AtomicBool::new(false),
        }
    }

    /// Feed one sample. `true` exactly on a `false → true` transition.
    pub fn update(&self, alert: bool) -> bool {
        let was = self.previous.swap(alert, Ordering::AcqRel);
        alert && !was
    }
}

/// Subscribes to smoke readings and runs the alarm response.
pub struct SmokeResponse {
    edge: AlertEdge,
    fan: Arc<Fan>,
    lamp: Arc<Lamp>,
}

impl SmokeResponse {
    pub fn new(fan: Arc<Fan>, lamp: Arc<Lamp>) -> Self {
        Self {
            edge: AlertEdge::new(),
            fan,
            lamp,
        }
    }

    /// Returns `true` when the response fired for this sample.
    pub fn on_alert_sample(&self, alert: bool, ppm: f32) -> bool {
        if !self.edge.update(alert) {
            return false;
        }
        warn!("Smoke alert ({:.0} ppm): fan to max, lamp on", ppm);
        if let Err(e) = self.fan.set_level(MAX_LEVEL) {
            error!("Smoke response: fan failed: {}", e);
        }
        if let Err(e) = self.lamp.turn_on() {
            error!("Smoke response: lamp failed: {}", e);
        }
        true
    }
}

impl EventSink for SmokeResponse {
    fn emit(&self, event: &DeviceEvent) {
        if let DeviceEvent::Smoke(reading) = event {
            self.on_alert_sample(reading.alert, reading.ppm);
        }
    }
}

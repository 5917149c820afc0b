//! Outbound device events.
//!
//! Actuator tasks and sensor pollers emit these through the
//! [`EventSink`](super::ports::EventSink) port whenever published state
//! changes. Adapters on the other side decide what to do with them: log
//! to serial, publish to the broker, update the display panel.

use crate::actuators::curtain::CurtainSnapshot;
use crate::actuators::fan::FanSnapshot;
use crate::actuators::lamp::LampSnapshot;
use crate::sensors::dht11::ClimateReading;
use crate::sensors::mq2::SmokeReading;

/// Structured events emitted by the device layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceEvent {
    /// Curtain started, finished, aborted or stopped.
    Curtain(CurtainSnapshot),
    /// Fan level changed.
    Fan(FanSnapshot),
    /// Lamp power changed.
    Lamp(LampSnapshot),
    /// Fresh DHT11 reading.
    Climate(ClimateReading),
    /// Fresh MQ-2 reading.
    Smoke(SmokeReading),
}

impl DeviceEvent {
    /// Short tag used in log lines.
    pub fn source(&self) -> &'static str {
        match self {
            Self::Curtain(_) => "curtain",
            Self::Fan(_) => "fan",
            Self::Lamp(_) => "lamp",
            Self::Climate(_) => "dht11",
            Self::Smoke(_) => "mq2",
        }
    }
}

//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ sensors / actuators / integration (domain)
//! ```
//!
//! Digital outputs, PWM and delays use the `embedded-hal` 1.0 traits
//! directly. The ports below cover what `embedded-hal` does not: a
//! direction-switching single-wire line, an ADC with optional calibration,
//! the broker transport, and the event fan-out.

use std::sync::Arc;

use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::{CommsError, SensorError};

use super::events::DeviceEvent;

// ───────────────────────────────────────────────────────────────
// Single-wire line (driven adapter: DHT11 data pin)
// ───────────────────────────────────────────────────────────────

/// A bidirectional GPIO that the host drives during the start signal and
/// then hands over to the sensor.
pub trait BitBangLine: InputPin + OutputPin {
    /// Switch the pin to output so the host can drive it.
    fn set_output_mode(&mut self) -> Result<(), Self::Error>;

    /// Switch the pin to input and let the pull-up / sensor own the level.
    fn set_input_mode(&mut self) -> Result<(), Self::Error>;
}

// ───────────────────────────────────────────────────────────────
// Analog input (driven adapter: MQ-2 divider)
// ───────────────────────────────────────────────────────────────

/// One ADC channel.
pub trait AnalogInput {
    /// One raw conversion.
    fn read_raw(&mut self) -> Result<u16, SensorError>;

    /// Convert a raw code with the chip's calibration scheme.
    ///
    /// `None` when no calibration is available; callers then fall back to
    /// a linear transform.
    fn calibrated_millivolts(&mut self, raw: u16) -> Option<u32>;
}

// ───────────────────────────────────────────────────────────────
// Broker transport (driven adapter: domain → MQTT client)
// ───────────────────────────────────────────────────────────────

/// Connection-lifecycle events the transport reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    Connected,
    Disconnected,
    Message { topic: String, payload: String },
}

/// Callback the transport invokes from its own event context.
pub type BrokerEventHandler = Box<dyn Fn(BrokerEvent) + Send + Sync>;

/// The network half of the integration layer. Implementations own the
/// socket and protocol; [`MqttClient`](crate::integration::mqtt::MqttClient)
/// owns state, registry and replay.
pub trait BrokerTransport: Send + Sync {
    /// Start the client. Connection outcome arrives later as a
    /// [`BrokerEvent`].
    fn start(&self, on_event: BrokerEventHandler) -> Result<(), CommsError>;

    /// Issue a subscription at QoS 1.
    fn subscribe(&self, topic: &str) -> Result<(), CommsError>;

    /// Publish at QoS 1.
    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → broker / panel / log)
// ───────────────────────────────────────────────────────────────

/// Actuators and pollers emit [`DeviceEvent`]s through this port.
/// Adapters decide where they go.
///
/// Sinks are called from actuator and sensor task context, so they must
/// not block for long.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &DeviceEvent);
}

/// Forwards every event to each registered sink in order.
#[derive(Default, Clone)]
pub struct FanOut {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

impl EventSink for FanOut {
    fn emit(&self, event: &DeviceEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

/// Discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &DeviceEvent) {}
}

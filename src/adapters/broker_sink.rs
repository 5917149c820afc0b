//! Broker state sink.
//!
//! Publishes every [`DeviceEvent`] as retained JSON on the device's state
//! topic, so a subscriber that joins late still sees the last known state.
//! While the broker is down the event is dropped; the on-connected
//! callback republishes current state after every reconnect.

use std::sync::Arc;

use log::debug;

use crate::app::events::DeviceEvent;
use crate::app::ports::EventSink;
use crate::config::Topics;
use crate::integration::mqtt::MqttClient;

pub struct BrokerStateSink {
    client: Arc<MqttClient>,
    topics: Topics,
}

impl BrokerStateSink {
    pub fn new(client: Arc<MqttClient>, topics: Topics) -> Self {
        Self { client, topics }
    }

    /// State topic and JSON body for one event.
    pub fn render<'a>(topics: &'a Topics, event: &DeviceEvent) -> (&'a str, String) {
        match event {
            DeviceEvent::Curtain(s) => (&topics.curtain_state, s.to_json().to_string()),
            DeviceEvent::Fan(s) => (&topics.fan_state, s.to_json().to_string()),
            DeviceEvent::Lamp(s) => (&topics.lamp_state, s.to_json().to_string()),
            DeviceEvent::Climate(r) => (&topics.dht11_state, r.to_json().to_string()),
            DeviceEvent::Smoke(r) => (&topics.mq2_state, r.to_json().to_string()),
        }
    }
}

impl EventSink for BrokerStateSink {
    fn emit(&self, event: &DeviceEvent) {
        let (topic, payload) = Self::render(&self.topics, event);
        if !self.client.publish(topic, &payload, true) {
            debug!("MQTT: {} state not published (offline)", event.source());
        }
    }
}

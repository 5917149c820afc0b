//! ESP-IDF MQTT client as a [`BrokerTransport`].
//!
//! The client is created on the first `start` (after the station has an
//! IP) and reports lifecycle events from the ESP-IDF MQTT task. The
//! esp-mqtt component reconnects on its own; every reconnect arrives here
//! as another `Connected` event.
//!
//! Events are handed to a separate thread rather than handled on the
//! esp-mqtt task: handling `Connected` re-subscribes through this
//! transport, and the esp-mqtt task must never wait on the client lock
//! while another thread holds it inside `publish`.

use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};

use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttEvent, EventPayload, MqttClientConfiguration, QoS,
};
use log::{info, warn};

use crate::app::ports::{BrokerEvent, BrokerEventHandler, BrokerTransport};
use crate::drivers::task_pin::{self, Core};
use crate::error::CommsError;

const EVENT_TASK_PRIORITY: u8 = 5;
const EVENT_STACK_KB: usize = 6;

pub struct EspMqttTransport {
    uri: String,
    client_id: String,
    username: String,
    password: String,
    client: Mutex<Option<EspMqttClient<'static>>>,
}

impl EspMqttTransport {
    pub fn new(uri: &str, client_id: &str, username: &str, password: &str) -> Self {
        Self {
            uri: uri.to_owned(),
            client_id: client_id.to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
            client: Mutex::new(None),
        }
    }

    fn with_client<T>(
        &self,
        f: impl FnOnce(&mut EspMqttClient<'static>) -> Result<T, CommsError>,
    ) -> Result<T, CommsError> {
        let mut guard = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(client) => f(client),
            None => Err(CommsError::NotConnected),
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

impl BrokerTransport for EspMqttTransport {
    fn start(&self, on_event: BrokerEventHandler) -> Result<(), CommsError> {
        let config = MqttClientConfiguration {
            client_id: non_empty(&self.client_id),
            username: non_empty(&self.username),
            password: non_empty(&self.password),
            ..Default::default()
        };

        // Held until the client is stored so an early `Connected` cannot
        // re-subscribe against an empty slot.
        let mut slot = self.client.lock().unwrap_or_else(PoisonError::into_inner);

        let (tx, rx) = mpsc::channel::<BrokerEvent>();
        task_pin::spawn_on_core(
            Core::Pro,
            EVENT_TASK_PRIORITY,
            EVENT_STACK_KB,
            "mqtt-events\0",
            move || {
                for event in rx {
                    on_event(event);
                }
            },
        )
        .map_err(|e| {
            warn!("MQTT: event task spawn failed: {}", e);
            CommsError::ConnectFailed
        })?;

        let client = EspMqttClient::new_cb(&self.uri, &config, move |event: EspMqttEvent<'_>| {
            let forwarded = match event.payload() {
                EventPayload::Connected(_) => Some(BrokerEvent::Connected),
                EventPayload::Disconnected => Some(BrokerEvent::Disconnected),
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => Some(BrokerEvent::Message {
                    topic: topic.to_owned(),
                    payload: String::from_utf8_lossy(data).into_owned(),
                }),
                EventPayload::Error(e) => {
                    warn!("MQTT: client error: {:?}", e);
                    None
                }
                _ => None,
            };
            if let Some(event) = forwarded {
                let _ = tx.send(event);
            }
        })
        .map_err(|e| {
            warn!("MQTT: client init failed: {:?}", e);
            CommsError::ConnectFailed
        })?;

        *slot = Some(client);
        info!("MQTT: client started ({})", self.uri);
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<(), CommsError> {
        self.with_client(|c| {
            c.subscribe(topic, QoS::AtLeastOnce)
                .map(|_| ())
                .map_err(|_| CommsError::SubscribeFailed)
        })
    }

    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), CommsError> {
        self.with_client(|c| {
            c.publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes())
                .map(|_| ())
                .map_err(|_| CommsError::PublishFailed)
        })
    }
}

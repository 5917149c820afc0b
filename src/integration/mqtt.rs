//! Broker client: connection state, subscription registry, replay.
//!
//! ```text
//!   Wi-Fi got IP ──▶ on_network_ready() ──▶ transport.start()
//!                                               │
//!           BrokerEvent::Connected ◀────────────┘
//!                 │
//!                 ├─▶ re-issue every registered subscription
//!                 └─▶ run every on-connected callback (discovery, state)
//! ```
//!
//! The state flips only on transport events. `publish` while disconnected
//! returns `false`; nothing is buffered. The registry lock is never held
//! across a transport call or a user callback.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{debug, info, warn};
use serde_json::{Value, json};

use crate::app::ports::{BrokerEvent, BrokerTransport};
use crate::error::CommsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Handler for messages on one exact topic: `(topic, payload)`.
pub type MessageHandler = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Runs once per Connected transition.
pub type ConnectedCallback = Arc<dyn Fn(&MqttClient) + Send + Sync>;

struct Registry {
    state: ConnectionState,
    subscriptions: BTreeMap<String, MessageHandler>,
    on_connected: Vec<ConnectedCallback>,
}

pub struct MqttClient {
    transport: Arc<dyn BrokerTransport>,
    registry: Mutex<Registry>,
    started: AtomicBool,
    broker_uri: String,
    default_topic: String,
    me: Weak<MqttClient>,
}

impl MqttClient {
    pub fn new(
        transport: Arc<dyn BrokerTransport>,
        broker_uri: impl Into<String>,
        default_topic: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            transport,
            registry: Mutex::new(Registry {
                state: ConnectionState::Disconnected,
                subscriptions: BTreeMap::new(),
                on_connected: Vec::new(),
            }),
            started: AtomicBool::new(false),
            broker_uri: broker_uri.into(),
            default_topic: default_topic.into(),
            me: me.clone(),
        })
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Network layer has an address. Starts the transport the first time;
    /// later calls are no-ops.
    pub fn on_network_ready(&self) -> Result<(), CommsError> {
        if self.started.swap(true, Ordering::AcqRel) {
            debug!("MQTT: transport already started");
            return Ok(());
        }
        info!("MQTT: network ready, connecting to {}", self.broker_uri);

        let me = self.me.clone();
        let handler = Box::new(move |event: BrokerEvent| {
            if let Some(client) = me.upgrade() {
                client.handle_event(event);
            }
        });
        if let Err(e) = self.transport.start(handler) {
            warn!("MQTT: transport start failed: {}", e);
            self.started.store(false, Ordering::Release);
            return Err(e);
        }
        Ok(())
    }

    /// Entry point for transport callbacks.
    pub fn handle_event(&self, event: BrokerEvent) {
        match event {
            BrokerEvent::Connected => self.on_connected_event(),
            BrokerEvent::Disconnected => {
                self.registry().state = ConnectionState::Disconnected;
                info!("MQTT: disconnected");
            }
            BrokerEvent::Message { topic, payload } => self.dispatch(&topic, &payload),
        }
    }

    fn on_connected_event(&self) {
        let (topics, callbacks) = {
            let mut reg = self.registry();
            reg.state = ConnectionState::Connected;
            let topics: Vec<String> = reg.subscriptions.keys().cloned().collect();
            (topics, reg.on_connected.clone())
        };
        info!(
            "MQTT: connected ({} subscriptions, {} callbacks)",
            topics.len(),
            callbacks.len()
        );

        for topic in &topics {
            if let Err(e) = self.transport.subscribe(topic) {
                warn!("MQTT: resubscribe {} failed: {}", topic, e);
            }
        }
        for callback in &callbacks {
            callback(self);
        }
    }

    fn dispatch(&self, topic: &str, payload: &str) {
        let handler = self.registry().subscriptions.get(topic).cloned();
        match handler {
            Some(handler) => handler(topic, payload),
            None => debug!("MQTT: no handler for {}", topic),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.registry().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// QoS 1 publish. `false` when disconnected or the transport refuses.
    pub fn publish(&self, topic: &str, payload: &str, retain: bool) -> bool {
        match self.try_publish(topic, payload, retain) {
            Ok(()) => true,
            Err(CommsError::NetworkNotReady | CommsError::NotConnected) => {
                debug!("MQTT: not connected, dropping publish to {}", topic);
                false
            }
            Err(e) => {
                warn!("MQTT: publish to {} failed: {}", topic, e);
                false
            }
        }
    }

    /// As [`publish`](Self::publish), with the reason on failure.
    pub fn try_publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), CommsError> {
        if !self.is_connected() {
            return Err(if self.started.load(Ordering::Acquire) {
                CommsError::NotConnected
            } else {
                CommsError::NetworkNotReady
            });
        }
        self.transport.publish(topic, payload, retain)?;
        debug!("MQTT: published to {}", topic);
        Ok(())
    }

    /// Register `handler` for `topic` (replacing any previous one). The
    /// subscription is issued now if connected, otherwise on the next
    /// Connected transition.
    pub fn subscribe(&self, topic: &str, handler: MessageHandler) {
        let connected = {
            let mut reg = self.registry();
            if reg.subscriptions.insert(topic.to_owned(), handler).is_some() {
                debug!("MQTT: handler for {} replaced", topic);
            }
            reg.state == ConnectionState::Connected
        };
        if connected {
            if let Err(e) = self.transport.subscribe(topic) {
                warn!("MQTT: subscribe {} failed: {}", topic, e);
            }
        }
    }

    /// Register a callback for every Connected transition. Runs immediately
    /// as well when already connected.
    pub fn on_connected(&self, callback: ConnectedCallback) {
        let connected = {
            let mut reg = self.registry();
            reg.on_connected.push(callback.clone());
            reg.state == ConnectionState::Connected
        };
        if connected {
            callback(self);
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.registry().subscriptions.len()
    }

    pub fn default_topic(&self) -> &str {
        &self.default_topic
    }

    pub fn broker_uri(&self) -> &str {
        &self.broker_uri
    }

    /// `{"connected","broker","topic"}` for the control surface.
    pub fn status_json(&self) -> Value {
        json!({
            "connected": self.is_connected(),
            "broker": self.broker_uri,
            "topic": self.default_topic,
        })
    }
}

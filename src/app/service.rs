//! Application service: wires devices to the outside world.
//!
//! [`AppService`] holds the actuator handles, the sensor caches and the
//! broker client. It is the single place where
//!
//! - broker command topics are subscribed and decoded,
//! - discovery and current state are published after every (re)connect,
//! - decoded panel frames are routed ([`CommandRouter`]),
//! - the control-surface tools are registered.
//!
//! ```text
//!  broker cmd ──▶ ┌────────────────────────┐ ──▶ Curtain / Fan / Lamp
//!  panel frame ─▶ │       AppService       │
//!  tool call ───▶ │  routing · discovery   │ ◀── SensorCache (DHT11, MQ-2)
//!                 └────────────────────────┘
//! ```

use std::sync::{Arc, Weak};

use log::{info, warn};
use serde_json::{Value, json};

use crate::actuators::curtain::{Curtain, CurtainCommand};
use crate::actuators::fan::{Fan, MAX_LEVEL};
use crate::actuators::lamp::Lamp;
use crate::actuators::{Outcome, Rejection};
use crate::config::SystemConfig;
use crate::integration::discovery;
use crate::integration::mqtt::{MessageHandler, MqttClient};
use crate::sensors::SensorCache;
use crate::sensors::dht11::ClimateReading;
use crate::sensors::mq2::SmokeReading;

use super::commands::{CommandRouter, DeviceCommand};
use super::tools::{ParamSpec, ToolError, ToolRegistry};

const NOT_AVAILABLE: &str = "N/A";

/// Actuator handles, each already driving its hardware.
pub struct Devices {
    pub curtain: Curtain,
    pub fan: Arc<Fan>,
    pub lamp: Arc<Lamp>,
}

/// Latest readings shared with the sensor pollers.
#[derive(Default, Clone)]
pub struct Readings {
    pub climate: Arc<SensorCache<ClimateReading>>,
    pub smoke: Arc<SensorCache<SmokeReading>>,
}

pub struct AppService {
    config: SystemConfig,
    devices: Devices,
    readings: Readings,
    mqtt: Arc<MqttClient>,
}

impl AppService {
    pub fn new(
        config: SystemConfig,
        devices: Devices,
        readings: Readings,
        mqtt: Arc<MqttClient>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            devices,
            readings,
            mqtt,
        })
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn mqtt(&self) -> &Arc<MqttClient> {
        &self.mqtt
    }

    // ── Broker wiring ─────────────────────────────────────────

    /// Subscribe the command topics and install the on-connected
    /// publisher. Handlers hold a weak reference so the client's registry
    /// does not keep the service alive.
    pub fn attach_broker(self: &Arc<Self>) {
        let topics = &self.config.topics;
        self.mqtt.subscribe(
            &topics.fan_command,
            self.handler(|svc, payload| {
                if let Err(e) = svc.devices.fan.apply_command(payload) {
                    warn!("MQTT: fan command '{}' rejected: {}", payload, e);
                }
            }),
        );
        self.mqtt.subscribe(
            &topics.fan_percentage_command,
            self.handler(|svc, payload| {
                if let Err(e) = svc.devices.fan.apply_speed(payload) {
                    warn!("MQTT: fan speed '{}' rejected: {}", payload, e);
                }
            }),
        );
        self.mqtt.subscribe(
            &topics.lamp_command,
            self.handler(|svc, payload| {
                if let Err(e) = svc.devices.lamp.apply_command(payload) {
                    warn!("MQTT: lamp command '{}' rejected: {}", payload, e);
                }
            }),
        );
        self.mqtt.subscribe(
            &topics.curtain_command,
            self.handler(|svc, payload| match CurtainCommand::from_payload(payload) {
                Some(cmd) => match svc.devices.curtain.command(cmd) {
                    Ok(outcome) => info!("MQTT: curtain {:?} -> {}", cmd, outcome.as_str()),
                    Err(rejection) => warn!("MQTT: curtain {:?} rejected: {}", cmd, rejection),
                },
                None => warn!("MQTT: unknown curtain payload '{}'", payload),
            }),
        );

        let me = Arc::downgrade(self);
        self.mqtt.on_connected(Arc::new(move |_client: &MqttClient| {
            if let Some(svc) = me.upgrade() {
                svc.publish_discovery();
                svc.publish_states();
            }
        }));
    }

    fn handler(self: &Arc<Self>, f: fn(&AppService, &str)) -> MessageHandler {
        let me: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |_topic: &str, payload: &str| {
            if let Some(svc) = me.upgrade() {
                f(&svc, payload.trim());
            }
        })
    }

    /// Retained discovery config for every entity. Returns how many were
    /// accepted by the client.
    pub fn publish_discovery(&self) -> usize {
        let entries = discovery::all(&self.config);
        let total = entries.len();
        let sent = entries
            .iter()
            .filter(|e| self.mqtt.publish(&e.topic, &e.payload.to_string(), true))
            .count();
        info!("MQTT: discovery published ({}/{})", sent, total);
        sent
    }

    /// Retained current state for every device with something to report.
    pub fn publish_states(&self) {
        let topics = &self.config.topics;
        let d = &self.devices;
        self.mqtt
            .publish(&topics.fan_state, &d.fan.snapshot().to_json().to_string(), true);
        self.mqtt
            .publish(&topics.lamp_state, &d.lamp.snapshot().to_json().to_string(), true);
        self.mqtt.publish(
            &topics.curtain_state,
            &d.curtain.snapshot().to_json().to_string(),
            true,
        );
        if let Some(r) = self.readings.climate.value() {
            self.mqtt
                .publish(&topics.dht11_state, &r.to_json().to_string(), true);
        }
        if let Some(r) = self.readings.smoke.value() {
            self.mqtt
                .publish(&topics.mq2_state, &r.to_json().to_string(), true);
        }
    }

    // ── Control surface ───────────────────────────────────────

    /// Build the tool registry for this device.
    pub fn tools(self: &Arc<Self>) -> ToolRegistry {
        let mut r = ToolRegistry::new();
        self.register_curtain_tools(&mut r);
        self.register_fan_tools(&mut r);
        self.register_lamp_tools(&mut r);
        self.register_sensor_tools(&mut r);
        self.register_mqtt_tools(&mut r);
        r
    }

    fn register_curtain_tools(self: &Arc<Self>, r: &mut ToolRegistry) {
        let svc = Arc::clone(self);
        r.register(
            "self.curtain.open",
            "Open the curtain. Rejected while the curtain is moving.",
            vec![],
            Box::new(move |_| Ok(curtain_reply(svc.devices.curtain.open()))),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.curtain.close",
            "Close the curtain. Rejected while the curtain is moving.",
            vec![],
            Box::new(move |_| Ok(curtain_reply(svc.devices.curtain.close()))),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.curtain.stop",
            "Stop the curtain immediately.",
            vec![],
            Box::new(move |_| Ok(json!(svc.devices.curtain.stop()))),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.curtain.get_status",
            "Curtain state: is_running, state, current_step.",
            vec![],
            Box::new(move |_| Ok(svc.devices.curtain.snapshot().to_json())),
        );
    }

    fn register_fan_tools(self: &Arc<Self>, r: &mut ToolRegistry) {
        let svc = Arc::clone(self);
        r.register(
            "self.fan.get_state",
            "Fan power and speed level.",
            vec![],
            Box::new(move |_| Ok(svc.devices.fan.snapshot().to_json())),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.fan.set_speed",
            "Set the fan speed level, 0 (off) to 3 (max).",
            vec![ParamSpec::integer("level", 0, i64::from(MAX_LEVEL))],
            Box::new(move |args| {
                let level = args.integer("level")?;
                // Range was validated against MAX_LEVEL.
                svc.devices
                    .fan
                    .set_level(level as u8)
                    .map(|_| json!(true))
                    .map_err(|e| ToolError::Failed(e.to_string()))
            }),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.fan.turn_on",
            "Turn the fan on at the default level.",
            vec![],
            Box::new(move |_| applied(svc.devices.fan.turn_on())),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.fan.turn_off",
            "Turn the fan off.",
            vec![],
            Box::new(move |_| applied(svc.devices.fan.turn_off())),
        );
    }

    fn register_lamp_tools(self: &Arc<Self>, r: &mut ToolRegistry) {
        let svc = Arc::clone(self);
        r.register(
            "self.lamp.get_state",
            "Lamp power state.",
            vec![],
            Box::new(move |_| Ok(svc.devices.lamp.snapshot().to_json())),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.lamp.turn_on",
            "Turn the lamp on.",
            vec![],
            Box::new(move |_| applied(svc.devices.lamp.turn_on())),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.lamp.turn_off",
            "Turn the lamp off.",
            vec![],
            Box::new(move |_| applied(svc.devices.lamp.turn_off())),
        );
    }

    fn register_sensor_tools(self: &Arc<Self>, r: &mut ToolRegistry) {
        let svc = Arc::clone(self);
        r.register(
            "self.sensor.read_dht11",
            "Latest temperature (°C) and relative humidity (%).",
            vec![],
            Box::new(move |_| Ok(svc.readings.climate.value().map_or_else(no_data, |c| c.to_json()))),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.sensor.get_temperature",
            "Latest temperature in °C.",
            vec![],
            Box::new(move |_| Ok(scalar(svc.readings.climate.value().map(|c| c.temperature)))),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.sensor.get_humidity",
            "Latest relative humidity in %.",
            vec![],
            Box::new(move |_| Ok(scalar(svc.readings.climate.value().map(|c| c.humidity)))),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.sensor.read_mq2",
            "Latest smoke reading: raw, voltage, ppm, alert.",
            vec![],
            Box::new(move |_| Ok(svc.readings.smoke.value().map_or_else(no_data, |s| s.to_json()))),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.sensor.get_smoke_ppm",
            "Latest smoke concentration in ppm.",
            vec![],
            Box::new(move |_| Ok(scalar(svc.readings.smoke.value().map(|s| s.ppm)))),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.sensor.get_smoke_alert",
            "Smoke alert: ALERT, NORMAL, or N/A before the first read.",
            vec![],
            Box::new(move |_| {
                Ok(json!(match svc.readings.smoke.value() {
                    Some(s) if s.alert => "ALERT",
                    Some(_) => "NORMAL",
                    None => NOT_AVAILABLE,
                }))
            }),
        );
    }

    fn register_mqtt_tools(self: &Arc<Self>, r: &mut ToolRegistry) {
        let svc = Arc::clone(self);
        r.register(
            "self.mqtt.send_hello",
            "Publish 'hello' to the default topic.",
            vec![],
            Box::new(move |_| {
                let mqtt = &svc.mqtt;
                Ok(json!(mqtt.publish(mqtt.default_topic(), "hello", false)))
            }),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.mqtt.get_status",
            "Broker connection status.",
            vec![],
            Box::new(move |_| Ok(svc.mqtt.status_json())),
        );
        let svc = Arc::clone(self);
        r.register(
            "self.mqtt.send_message",
            "Publish a text message to a topic.",
            vec![ParamSpec::text("topic"), ParamSpec::text("message")],
            Box::new(move |args| {
                let topic = args.text("topic")?;
                if topic.is_empty() {
                    return Ok(json!(false));
                }
                Ok(json!(svc.mqtt.publish(topic, args.text("message")?, false)))
            }),
        );
    }
}

/// `true` on start, the reason string on rejection or no-op, `false` when
/// the queue is full.
fn curtain_reply(result: Result<Outcome, Rejection>) -> Value {
    match result {
        Ok(Outcome::Started | Outcome::Applied) => json!(true),
        Ok(outcome) => json!(outcome.as_str()),
        Err(Rejection::QueueFull) => json!(false),
        Err(rejection) => json!(rejection.reason()),
    }
}

fn applied<T>(result: crate::error::Result<T>) -> Result<Value, ToolError> {
    result
        .map(|_| json!(true))
        .map_err(|e| ToolError::Failed(e.to_string()))
}

fn no_data() -> Value {
    json!({ "error": "no_data", "message": "Waiting for first read" })
}

fn scalar(value: Option<f32>) -> Value {
    value.map_or_else(
        || json!(NOT_AVAILABLE),
        |v| json!((f64::from(v) * 100.0).round() / 100.0),
    )
}

impl CommandRouter for AppService {
    fn route(&self, cmd: DeviceCommand) -> bool {
        let result = match cmd {
            DeviceCommand::LampOn => self.devices.lamp.turn_on().map(|_| ()),
            DeviceCommand::LampOff => self.devices.lamp.turn_off().map(|_| ()),
            DeviceCommand::FanOn => self.devices.fan.turn_on().map(|_| ()),
            DeviceCommand::FanOff => self.devices.fan.turn_off().map(|_| ()),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Panel: {:?} failed: {}", cmd, e);
                false
            }
        }
    }
}

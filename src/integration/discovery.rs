//! Home-automation discovery payloads.
//!
//! Each entity gets a retained config document on its
//! `homeassistant/<component>/<device>/<object>/config` topic. All of them
//! share the same `device` block so the hub groups them under one device.

use serde::Serialize;
use serde_json::{Value, json};

use crate::config::{DeviceInfo, SystemConfig};

#[derive(Serialize)]
struct DeviceBlock<'a> {
    identifiers: [&'a str; 1],
    name: &'a str,
    model: &'a str,
    manufacturer: &'a str,
    sw_version: &'a str,
}

fn device_block(d: &DeviceInfo) -> Value {
    serde_json::to_value(DeviceBlock {
        identifiers: [d.id.as_str()],
        name: &d.name,
        model: &d.model,
        manufacturer: &d.manufacturer,
        sw_version: &d.sw_version,
    })
    .unwrap_or(Value::Null)
}

/// One retained discovery document.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryEntry {
    pub topic: String,
    pub payload: Value,
}

impl DiscoveryEntry {
    fn new(topic: &str, payload: Value) -> Self {
        Self {
            topic: topic.to_owned(),
            payload,
        }
    }
}

pub fn fan(cfg: &SystemConfig) -> DiscoveryEntry {
    let t = &cfg.topics;
    DiscoveryEntry::new(
        &t.fan_config,
        json!({
            "unique_id": format!("{}-fan", cfg.device.id),
            "name": "Fan",
            "icon": "mdi:fan",
            "command_topic": t.fan_command,
            "state_topic": t.fan_state,
            "state_value_template": "{{ value_json.state }}",
            "payload_on": "ON",
            "payload_off": "OFF",
            "percentage_command_topic": t.fan_percentage_command,
            "percentage_state_topic": t.fan_state,
            "percentage_value_template": "{{ value_json.speed }}",
            "speed_range_min": 1,
            "speed_range_max": 3,
            "device": device_block(&cfg.device),
        }),
    )
}

pub fn lamp(cfg: &SystemConfig) -> DiscoveryEntry {
    let t = &cfg.topics;
    DiscoveryEntry::new(
        &t.lamp_config,
        json!({
            "unique_id": format!("{}-lamp", cfg.device.id),
            "name": "Lamp",
            "icon": "mdi:lightbulb",
            "command_topic": t.lamp_command,
            "state_topic": t.lamp_state,
            "state_value_template": "{{ value_json.state }}",
            "payload_on": "ON",
            "payload_off": "OFF",
            "device": device_block(&cfg.device),
        }),
    )
}

pub fn curtain(cfg: &SystemConfig) -> DiscoveryEntry {
    let t = &cfg.topics;
    DiscoveryEntry::new(
        &t.curtain_config,
        json!({
            "unique_id": format!("{}-curtain", cfg.device.id),
            "name": "Curtain",
            "device_class": "curtain",
            "command_topic": t.curtain_command,
            "state_topic": t.curtain_state,
            "value_template": "{{ value_json.state }}",
            "payload_open": "OPEN",
            "payload_close": "CLOSE",
            "payload_stop": "STOP",
            "state_open": "open",
            "state_closed": "closed",
            "state_opening": "opening",
            "state_closing": "closing",
            "device": device_block(&cfg.device),
        }),
    )
}

pub fn temperature(cfg: &SystemConfig) -> DiscoveryEntry {
    let t = &cfg.topics;
    DiscoveryEntry::new(
        &t.dht11_temp_config,
        json!({
            "unique_id": format!("{}-dht11-temp", cfg.device.id),
            "name": "Temperature",
            "state_topic": t.dht11_state,
            "value_template": "{{ value_json.temperature }}",
            "unit_of_measurement": "°C",
            "device_class": "temperature",
            "device": device_block(&cfg.device),
        }),
    )
}

pub fn humidity(cfg: &SystemConfig) -> DiscoveryEntry {
    let t = &cfg.topics;
    DiscoveryEntry::new(
        &t.dht11_humi_config,
        json!({
            "unique_id": format!("{}-dht11-humi", cfg.device.id),
            "name": "Humidity",
            "state_topic": t.dht11_state,
            "value_template": "{{ value_json.humidity }}",
            "unit_of_measurement": "%",
            "device_class": "humidity",
            "device": device_block(&cfg.device),
        }),
    )
}

pub fn smoke(cfg: &SystemConfig) -> DiscoveryEntry {
    let t = &cfg.topics;
    DiscoveryEntry::new(
        &t.mq2_config,
        json!({
            "unique_id": format!("{}-mq2-smoke", cfg.device.id),
            "name": "Smoke",
            "state_topic": t.mq2_state,
            "value_template": "{{ value_json.ppm }}",
            "unit_of_measurement": "ppm",
            "device_class": "volatile_organic_compounds",
            "icon": "mdi:smoke-detector",
            "device": device_block(&cfg.device),
        }),
    )
}

pub fn smoke_alert(cfg: &SystemConfig) -> DiscoveryEntry {
    let t = &cfg.topics;
    DiscoveryEntry::new(
        &t.mq2_alert_config,
        json!({
            "unique_id": format!("{}-mq2-alert", cfg.device.id),
            "name": "Smoke alarm",
            "state_topic": t.mq2_state,
            "value_template": "{{ value_json.alert }}",
            "payload_on": "True",
            "payload_off": "False",
            "device_class": "smoke",
            "device": device_block(&cfg.device),
        }),
    )
}

/// Every entity this device exposes.
pub fn all(cfg: &SystemConfig) -> Vec<DiscoveryEntry> {
    vec![
        fan(cfg),
        lamp(cfg),
        curtain(cfg),
        temperature(cfg),
        humidity(cfg),
        smoke(cfg),
        smoke_alert(cfg),
    ]
}

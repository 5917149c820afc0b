//! Application service: broker wiring, discovery and the control surface.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use roomhub::actuators::curtain::CurtainPosition;
use roomhub::adapters::memory_broker::MemoryBroker;
use roomhub::app::commands::{CommandRouter, DeviceCommand};
use roomhub::app::ports::NullSink;
use roomhub::app::service::{AppService, Devices, Readings};
use roomhub::app::tools::{ToolError, ToolRegistry};
use roomhub::config::SystemConfig;
use roomhub::integration::mqtt::MqttClient;
use roomhub::sensors::dht11::ClimateReading;
use roomhub::sensors::mq2::SmokeReading;

use crate::mock_hw::{MockPin, MockPwm, fan, lamp, spawn_curtain, wait_until};

struct Rig {
    service: Arc<AppService>,
    tools: ToolRegistry,
    broker: Arc<MemoryBroker>,
    readings: Readings,
    pwm: MockPwm,
    lamp_pin: MockPin,
}

fn rig(curtain_at: CurtainPosition) -> Rig {
    let config = SystemConfig::default();
    let broker = Arc::new(MemoryBroker::new());
    let mqtt = MqttClient::new(
        broker.clone(),
        config.broker_uri.clone(),
        config.default_topic.clone(),
    );
    let (curtain, _coils) = spawn_curtain(curtain_at, Arc::new(NullSink));
    let (fan, pwm) = fan(Arc::new(NullSink));
    let (lamp, lamp_pin) = lamp(Arc::new(NullSink));
    let readings = Readings::default();
    let service = AppService::new(
        config,
        Devices { curtain, fan, lamp },
        readings.clone(),
        mqtt,
    );
    let tools = service.tools();
    Rig {
        service,
        tools,
        broker,
        readings,
        pwm,
        lamp_pin,
    }
}

fn call(rig: &Rig, name: &str) -> Value {
    rig.tools.invoke(name, &Value::Null).unwrap()
}

fn connect(rig: &Rig) {
    rig.service.attach_broker();
    rig.service.mqtt().on_network_ready().unwrap();
    rig.broker.connect();
}

// ── Control surface ───────────────────────────────────────────

#[test]
fn every_tool_is_registered() {
    let rig = rig(CurtainPosition::Open);
    for name in [
        "self.curtain.open",
        "self.curtain.close",
        "self.curtain.stop",
        "self.curtain.get_status",
        "self.fan.get_state",
        "self.fan.set_speed",
        "self.fan.turn_on",
        "self.fan.turn_off",
        "self.lamp.get_state",
        "self.lamp.turn_on",
        "self.lamp.turn_off",
        "self.sensor.read_dht11",
        "self.sensor.get_temperature",
        "self.sensor.get_humidity",
        "self.sensor.read_mq2",
        "self.sensor.get_smoke_ppm",
        "self.sensor.get_smoke_alert",
        "self.mqtt.send_hello",
        "self.mqtt.get_status",
        "self.mqtt.send_message",
    ] {
        assert!(rig.tools.contains(name), "{name} missing");
    }
    assert_eq!(rig.tools.len(), 20);
}

#[test]
fn sensor_tools_before_and_after_first_read() {
    let rig = rig(CurtainPosition::Open);

    let no_data = json!({ "error": "no_data", "message": "Waiting for first read" });
    assert_eq!(call(&rig, "self.sensor.read_dht11"), no_data);
    assert_eq!(call(&rig, "self.sensor.read_mq2"), no_data);
    assert_eq!(call(&rig, "self.sensor.get_temperature"), json!("N/A"));
    assert_eq!(call(&rig, "self.sensor.get_smoke_ppm"), json!("N/A"));
    assert_eq!(call(&rig, "self.sensor.get_smoke_alert"), json!("N/A"));

    rig.readings.climate.store(ClimateReading {
        temperature: 24.0,
        humidity: 51.0,
    });
    rig.readings.smoke.store(SmokeReading {
        raw: 2481,
        voltage: 2.0,
        ppm: 3200.0,
        alert: true,
    });
    assert_eq!(call(&rig, "self.sensor.get_temperature"), json!(24.0));
    assert_eq!(call(&rig, "self.sensor.get_humidity"), json!(51.0));
    assert_eq!(
        call(&rig, "self.sensor.read_dht11"),
        json!({ "temperature": 24.0, "humidity": 51.0 })
    );
    assert_eq!(call(&rig, "self.sensor.get_smoke_alert"), json!("ALERT"));
    assert_eq!(call(&rig, "self.sensor.read_mq2")["alert"], true);
}

#[test]
fn fan_speed_is_range_checked() {
    let rig = rig(CurtainPosition::Open);

    assert_eq!(
        rig.tools.invoke("self.fan.set_speed", &json!({ "level": 2 })),
        Ok(json!(true))
    );
    assert_eq!(rig.pwm.duty(), 170);
    assert_eq!(
        call(&rig, "self.fan.get_state"),
        json!({ "state": "ON", "speed": 2 })
    );

    let err = rig
        .tools
        .invoke("self.fan.set_speed", &json!({ "level": 4 }))
        .unwrap_err();
    assert!(matches!(err, ToolError::OutOfRange { value: 4, .. }));
    assert_eq!(
        rig.tools.invoke("self.fan.set_speed", &Value::Null),
        Err(ToolError::MissingParam("level"))
    );
    // Rejected calls leave the fan alone.
    assert_eq!(rig.pwm.duty(), 170);

    assert_eq!(call(&rig, "self.fan.turn_off"), json!(true));
    assert_eq!(rig.pwm.duty(), 0);
}

#[test]
fn lamp_tools_drive_the_relay() {
    let rig = rig(CurtainPosition::Open);
    assert_eq!(call(&rig, "self.lamp.turn_on"), json!(true));
    assert!(rig.lamp_pin.is_high());
    assert_eq!(call(&rig, "self.lamp.get_state"), json!({ "state": "ON" }));
    assert_eq!(call(&rig, "self.lamp.turn_off"), json!(true));
    assert!(!rig.lamp_pin.is_high());
}

#[test]
fn curtain_tool_replies() {
    let rig = rig(CurtainPosition::Open);

    assert_eq!(call(&rig, "self.curtain.open"), json!("already_open"));
    assert_eq!(call(&rig, "self.curtain.close"), json!(true));
    assert_eq!(call(&rig, "self.curtain.open"), json!("curtain_is_running"));

    assert!(wait_until(Duration::from_secs(5), || {
        call(&rig, "self.curtain.get_status")["state"] == "closed"
    }));
    let status = call(&rig, "self.curtain.get_status");
    assert_eq!(status["is_running"], false);
    assert_eq!(status["current_step"], 200);
}

#[test]
fn mqtt_tools_report_offline_as_false() {
    let rig = rig(CurtainPosition::Open);
    assert_eq!(call(&rig, "self.mqtt.send_hello"), json!(false));
    assert_eq!(call(&rig, "self.mqtt.get_status")["connected"], false);

    connect(&rig);
    rig.broker.clear();
    assert_eq!(call(&rig, "self.mqtt.send_hello"), json!(true));
    assert_eq!(
        rig.broker.payloads_on("HA-XZ-01/01/state"),
        vec!["hello".to_string()]
    );

    let args = json!({ "topic": "room/note", "message": "hi" });
    assert_eq!(rig.tools.invoke("self.mqtt.send_message", &args), Ok(json!(true)));
    let empty = json!({ "topic": "", "message": "hi" });
    assert_eq!(rig.tools.invoke("self.mqtt.send_message", &empty), Ok(json!(false)));
}

// ── Broker wiring ─────────────────────────────────────────────

#[test]
fn connect_publishes_discovery_and_state() {
    let rig = rig(CurtainPosition::Open);
    connect(&rig);

    let topics = rig.service.config().topics.clone();
    let published = rig.broker.published();
    let discovery: Vec<_> = published
        .iter()
        .filter(|p| p.topic.starts_with("homeassistant/"))
        .collect();
    assert_eq!(discovery.len(), 7);
    assert!(discovery.iter().all(|p| p.retain));

    assert_eq!(
        rig.broker.payloads_on(&topics.lamp_state),
        vec![r#"{"state":"OFF"}"#.to_string()]
    );
    assert_eq!(rig.broker.payloads_on(&topics.fan_state).len(), 1);
    assert_eq!(rig.broker.payloads_on(&topics.curtain_state).len(), 1);
    // No reading yet, so no sensor state.
    assert!(rig.broker.payloads_on(&topics.dht11_state).is_empty());

    let mut subscribed = rig.broker.subscribed();
    subscribed.sort();
    let mut expected = vec![
        topics.fan_command.clone(),
        topics.fan_percentage_command.clone(),
        topics.lamp_command.clone(),
        topics.curtain_command.clone(),
    ];
    expected.sort();
    assert_eq!(subscribed, expected);
}

#[test]
fn reconnect_republishes_discovery() {
    let rig = rig(CurtainPosition::Open);
    connect(&rig);
    rig.broker.disconnect();
    rig.broker.clear();

    rig.broker.connect();
    let discovery = rig
        .broker
        .published()
        .iter()
        .filter(|p| p.topic.starts_with("homeassistant/"))
        .count();
    assert_eq!(discovery, 7);
    assert_eq!(rig.broker.subscribed().len(), 4);
}

#[test]
fn broker_commands_reach_the_devices() {
    let rig = rig(CurtainPosition::Open);
    connect(&rig);
    let topics = rig.service.config().topics.clone();

    rig.broker.deliver(&topics.lamp_command, "ON");
    assert!(rig.lamp_pin.is_high());

    rig.broker.deliver(&topics.fan_percentage_command, "3");
    assert_eq!(rig.pwm.duty(), 255);
    rig.broker.deliver(&topics.fan_percentage_command, "9");
    assert_eq!(rig.pwm.duty(), 255, "out-of-range speed ignored");
    rig.broker.deliver(&topics.fan_command, "OFF\n");
    assert_eq!(rig.pwm.duty(), 0);

    rig.broker.deliver(&topics.curtain_command, "CLOSE");
    assert!(wait_until(Duration::from_secs(5), || {
        call(&rig, "self.curtain.get_status")["state"] == "closed"
    }));
}

#[test]
fn panel_commands_are_routed() {
    let rig = rig(CurtainPosition::Open);
    assert!(rig.service.route(DeviceCommand::LampOn));
    assert!(rig.lamp_pin.is_high());
    assert!(rig.service.route(DeviceCommand::FanOn));
    assert_eq!(rig.pwm.duty(), 170);
    assert!(rig.service.route(DeviceCommand::FanOff));
    assert_eq!(rig.pwm.duty(), 0);
}

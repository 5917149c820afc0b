//! System configuration parameters
//!
//! All tunable parameters for the RoomHub controller. Broker topics are
//! derived from the device id so a second board only needs a new id.

use serde::{Deserialize, Serialize};

use crate::actuators::curtain::CurtainPosition;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Device identity ---
    pub device: DeviceInfo,

    // --- Network ---
    pub wifi_ssid: String,
    pub wifi_password: String,

    // --- Broker ---
    /// Broker URI, e.g. `mqtt://host:1883`.
    pub broker_uri: String,
    pub broker_username: String,
    pub broker_password: String,
    /// Topic used by the `send_hello` control-surface operation.
    pub default_topic: String,
    pub topics: Topics,

    // --- Peripherals ---
    pub dht11: Dht11Config,
    pub mq2: Mq2Config,
    pub curtain: CurtainConfig,
    pub fan: FanConfig,
    pub uart: UartConfig,
}

/// Identity block advertised in discovery payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub model: String,
    pub manufacturer: String,
    pub sw_version: String,
}

/// Every broker topic the controller publishes to or subscribes on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topics {
    pub dht11_state: String,
    pub dht11_temp_config: String,
    pub dht11_humi_config: String,
    pub mq2_state: String,
    pub mq2_config: String,
    pub mq2_alert_config: String,
    pub fan_config: String,
    pub fan_state: String,
    pub fan_command: String,
    pub fan_percentage_command: String,
    pub lamp_config: String,
    pub lamp_state: String,
    pub lamp_command: String,
    pub curtain_config: String,
    pub curtain_state: String,
    pub curtain_command: String,
}

impl Topics {
    /// Build the topic set for `device_id` using the
    /// `<id>/<component>/...` state layout and the
    /// `homeassistant/<kind>/<id>/<object>/config` discovery layout.
    pub fn for_device(device_id: &str) -> Self {
        let discovery = |kind: &str, object: &str| {
            format!("homeassistant/{kind}/{device_id}/{object}/config")
        };
        Self {
            dht11_state: format!("{device_id}/sensor/dht11/state"),
            dht11_temp_config: discovery("sensor", "dht11_temp"),
            dht11_humi_config: discovery("sensor", "dht11_humi"),
            mq2_state: format!("{device_id}/sensor/mq2/state"),
            mq2_config: discovery("sensor", "mq2_smoke"),
            mq2_alert_config: discovery("binary_sensor", "mq2_alert"),
            fan_config: discovery("fan", "fan"),
            fan_state: format!("{device_id}/fan/state"),
            fan_command: format!("{device_id}/fan/set"),
            fan_percentage_command: format!("{device_id}/fan/percentage/set"),
            lamp_config: discovery("light", "lamp"),
            lamp_state: format!("{device_id}/lamp/state"),
            lamp_command: format!("{device_id}/lamp/set"),
            curtain_config: discovery("cover", "curtain"),
            curtain_state: format!("{device_id}/curtain/state"),
            curtain_command: format!("{device_id}/curtain/set"),
        }
    }
}

/// DHT11 single-wire timing and polling parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Dht11Config {
    /// Background read interval (milliseconds)
    pub interval_ms: u32,
    /// Delay before the first read after power-up (milliseconds)
    pub stabilize_ms: u32,
    /// Start-signal low hold; the sensor needs at least 18 ms
    pub start_low_ms: u32,
    /// High release after the start signal (microseconds)
    pub release_us: u32,
    /// Settle time after switching the pin to input (microseconds)
    pub input_settle_us: u32,
    /// Bound on each acknowledgement pulse wait (microseconds)
    pub ack_timeout_us: u32,
    /// Bound on each bit edge wait (microseconds)
    pub bit_timeout_us: u32,
    /// Delay after the rising edge before sampling a bit (microseconds)
    pub sample_delay_us: u32,
}

impl Default for Dht11Config {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            stabilize_ms: 2000,
            start_low_ms: 20,
            release_us: 30,
            input_settle_us: 10,
            ack_timeout_us: 100,
            bit_timeout_us: 150,
            sample_delay_us: 40,
        }
    }
}

/// MQ-2 acquisition and calibration constants.
///
/// `R0` is site-calibrated in clean air; the remaining curve constants
/// describe the sensor's log-log response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Mq2Config {
    /// Raw samples averaged per read
    pub samples: u8,
    /// Delay between samples (milliseconds)
    pub sample_delay_ms: u32,
    /// Background read interval (milliseconds)
    pub interval_ms: u32,
    /// Heater warm-up before the first read (milliseconds)
    pub preheat_ms: u32,
    /// Raw code at full scale (12-bit ADC)
    pub adc_max_raw: u16,
    /// Millivolts at full scale for the uncalibrated fallback transform
    pub adc_full_scale_mv: u32,
    /// Voltages at or below this are treated as "no signal" (volts)
    pub min_voltage: f32,
    /// Sensor heater / divider supply (volts)
    pub supply_voltage: f32,
    /// Load resistor (kΩ)
    pub load_resistance_kohm: f32,
    /// Readings at or above this are clamped before the Rs division (volts)
    pub saturation_voltage: f32,
    pub baseline_ppm: f32,
    pub ppm_exponent: f32,
    pub max_ppm: f32,
    /// Alert when ppm strictly exceeds this
    pub alert_threshold_ppm: f32,
    /// Clean-air sensor resistance (kΩ)
    pub r0_kohm: f32,
}

impl Default for Mq2Config {
    fn default() -> Self {
        Self {
            samples: 10,
            sample_delay_ms: 5,
            interval_ms: 5000,
            preheat_ms: 5000,
            adc_max_raw: 4095,
            adc_full_scale_mv: 3300,
            min_voltage: 0.01,
            supply_voltage: 5.0,
            load_resistance_kohm: 1.0,
            saturation_voltage: 3.2,
            baseline_ppm: 8.0,
            ppm_exponent: 2.0,
            max_ppm: 999_999.0,
            alert_threshold_ppm: 100.0,
            r0_kohm: 30.0,
        }
    }
}

/// 28BYJ-48 curtain stepper parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CurtainConfig {
    /// Half-steps per full stroke (one output-shaft turn)
    pub steps_per_stroke: u32,
    /// Delay per half-step (milliseconds)
    pub step_delay_ms: u32,
    /// A pending stop is checked every this many steps
    pub abort_check_interval: u32,
    /// Bounded wait on the command queue (milliseconds)
    pub queue_wait_ms: u32,
    /// Position assumed at boot
    pub initial_position: CurtainPosition,
}

impl Default for CurtainConfig {
    fn default() -> Self {
        Self {
            steps_per_stroke: 4096,
            step_delay_ms: 2,
            abort_check_interval: 100,
            queue_wait_ms: 100,
            initial_position: CurtainPosition::Open,
        }
    }
}

/// Fan PWM parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FanConfig {
    /// 8-bit duty for levels 0..=3
    pub level_duty: [u8; 4],
    /// Level used by `turn_on`
    pub default_level: u8,
    pub pwm_frequency_hz: u32,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            level_duty: [0, 85, 170, 255],
            default_level: 2,
            pwm_frequency_hz: 25_000,
        }
    }
}

/// UART1 link to the display panel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UartConfig {
    pub baud_rate: u32,
    pub rx_buffer_size: usize,
    pub read_timeout_ms: u32,
    /// Longest message `SerialLink::send` accepts
    pub send_max_len: usize,
    /// Default prefix length for `SerialLink::receive`
    pub receive_default_len: usize,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            rx_buffer_size: 512,
            read_timeout_ms: 50,
            send_max_len: 256,
            receive_default_len: 128,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        let device_id = "XZ-ESP32-01";
        Self {
            device: DeviceInfo {
                id: device_id.into(),
                name: "RoomHub ESP32".into(),
                model: "ESP32-S3".into(),
                manufacturer: "RoomHub".into(),
                sw_version: env!("CARGO_PKG_VERSION").into(),
            },

            wifi_ssid: option_env!("ROOMHUB_WIFI_SSID").unwrap_or("").into(),
            wifi_password: option_env!("ROOMHUB_WIFI_PASS").unwrap_or("").into(),

            broker_uri: option_env!("ROOMHUB_MQTT_URI")
                .unwrap_or("mqtt://192.168.1.10:1883")
                .into(),
            broker_username: option_env!("ROOMHUB_MQTT_USER").unwrap_or("").into(),
            broker_password: option_env!("ROOMHUB_MQTT_PASS").unwrap_or("").into(),
            default_topic: "HA-XZ-01/01/state".into(),
            topics: Topics::for_device(device_id),

            dht11: Dht11Config::default(),
            mq2: Mq2Config::default(),
            curtain: CurtainConfig::default(),
            fan: FanConfig::default(),
            uart: UartConfig::default(),
        }
    }
}

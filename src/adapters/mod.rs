//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements         | Connects to                 |
//! |-----------------|--------------------|-----------------------------|
//! | `broker_sink`   | EventSink          | Retained broker state topics|
//! | `esp_io`        | BitBangLine        | DHT11 GPIO (open drain)     |
//! |                 | AnalogInput        | ESP32 ADC2 (MQ-2)           |
//! |                 | Transport          | UART1 display panel         |
//! | `esp_mqtt`      | BrokerTransport    | ESP-IDF MQTT client         |
//! | `log_sink`      | EventSink          | Serial log output           |
//! | `memory_broker` | BrokerTransport    | In-memory (host / tests)    |
//! | `panel_sink`    | EventSink          | Display panel status lines  |
//! | `wifi`          | ConnectivityPort   | ESP-IDF WiFi STA            |

pub mod broker_sink;
#[cfg(target_os = "espidf")]
pub mod esp_io;
#[cfg(target_os = "espidf")]
pub mod esp_mqtt;
pub mod log_sink;
pub mod memory_broker;
pub mod panel_sink;
pub mod wifi;

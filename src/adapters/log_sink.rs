//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every [`DeviceEvent`] as one line to
//! the ESP-IDF logger (UART0 / USB-CDC console in production).

use log::info;

use crate::app::events::DeviceEvent;
use crate::app::ports::EventSink;

#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &DeviceEvent) {
        match event {
            DeviceEvent::Curtain(s) => {
                info!(
                    "CURTAIN | state={} running={} step={}",
                    s.state_str(),
                    s.is_running(),
                    s.current_step
                );
            }
            DeviceEvent::Fan(s) => info!("FAN | level={} duty={}", s.level, s.duty),
            DeviceEvent::Lamp(s) => info!("LAMP | {}", if s.on { "ON" } else { "OFF" }),
            DeviceEvent::Climate(r) => {
                info!("DHT11 | T={:.0}\u{00b0}C RH={:.0}%", r.temperature, r.humidity);
            }
            DeviceEvent::Smoke(r) => {
                info!(
                    "MQ-2 | raw={} V={:.2} ppm={:.2} alert={}",
                    r.raw,
                    r.voltage,
                    r.ppm,
                    if r.alert { "YES" } else { "NO" }
                );
            }
        }
    }
}

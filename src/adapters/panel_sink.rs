//! Display panel sink.
//!
//! Turns sensor readings into `key="value"` status lines and actuator
//! changes into `a=<n>` feedback codes on the panel UART. Curtain events
//! have no panel widget and are ignored.

use std::sync::Arc;

use log::warn;

use crate::app::events::DeviceEvent;
use crate::app::ports::EventSink;
use crate::protocol::status_line::{self, StatusLine};
use crate::serial::link::SerialLink;

pub struct PanelSink {
    link: Arc<SerialLink>,
}

impl PanelSink {
    pub fn new(link: Arc<SerialLink>) -> Self {
        Self { link }
    }

    /// Lines the panel should receive for one event, in send order.
    pub fn lines(event: &DeviceEvent) -> Vec<StatusLine> {
        match event {
            DeviceEvent::Climate(r) => {
                let humidity = format!("{:.0}", r.humidity);
                let temperature = format!("{:.0}", r.temperature);
                [
                    status_line::field(status_line::SAVER_HUMIDITY, &humidity),
                    status_line::field(status_line::SAVER_TEMPERATURE, &temperature),
                    status_line::field(status_line::MAIN_TEMPERATURE, &temperature),
                ]
                .into_iter()
                .flatten()
                .collect()
            }
            DeviceEvent::Smoke(r) => {
                let ppm = r.ppm_display();
                [
                    status_line::field(status_line::SAVER_SMOKE, ppm),
                    status_line::field(status_line::MAIN_SMOKE, ppm),
                ]
                .into_iter()
                .flatten()
                .collect()
            }
            DeviceEvent::Lamp(s) => vec![status_line::code(if s.on {
                status_line::LAMP_ON
            } else {
                status_line::LAMP_OFF
            })],
            DeviceEvent::Fan(s) => vec![status_line::code(if s.is_on() {
                status_line::FAN_ON
            } else {
                status_line::FAN_OFF
            })],
            DeviceEvent::Curtain(_) => Vec::new(),
        }
    }
}

impl EventSink for PanelSink {
    fn emit(&self, event: &DeviceEvent) {
        for line in Self::lines(event) {
            if !self.link.send(&line) {
                warn!("Panel: {} line not sent", event.source());
            }
        }
    }
}

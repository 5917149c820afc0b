//! Application core.
//!
//! Ports and events define the hexagonal boundary; `commands` and `tools`
//! describe what callers may ask for; [`service`] wires the devices to the
//! broker, the display panel and the control surface. Hardware is only
//! reached through the actuator and sensor handles, so the whole layer
//! runs against mock adapters on the host.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod tools;

//! Wire formats spoken over the display panel UART.
//!
//! - [`frame`]: 7-byte command frames coming from the panel.
//! - [`status_line`]: `key="value"` lines going to the panel.

pub mod frame;
pub mod status_line;

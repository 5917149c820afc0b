//! Byte-stream command dispatcher: the serial receive task.
//!
//! ```text
//!  UART ──read(timeout)──▶ record last message ──▶ frame::decode
//!                                                     │ valid
//!                                     route command ◀─┤
//!                                     "PARSED:…"    ◀─┘ (always)
//! ```
//!
//! Each read is treated as one candidate frame; only its first seven bytes
//! are inspected. Invalid chunks are dropped without a reply.

use std::sync::Arc;
use std::thread::JoinHandle;

use log::{info, warn};

use crate::app::commands::{CommandRouter, DeviceCommand};
use crate::drivers::task_pin::{self, Core};
use crate::protocol::frame::{self, Frame};

use super::link::SerialLink;

const RX_TASK_PRIORITY: u8 = 4;
const RX_STACK_KB: usize = 4;

pub struct Dispatcher {
    link: Arc<SerialLink>,
    router: Arc<dyn CommandRouter>,
}

impl Dispatcher {
    pub fn new(link: Arc<SerialLink>, router: Arc<dyn CommandRouter>) -> Self {
        Self { link, router }
    }

    /// Process one received chunk. Returns the frame when it was valid.
    pub fn handle_chunk(&self, chunk: &[u8]) -> Option<Frame> {
        if chunk.is_empty() {
            return None;
        }
        self.link.record(chunk);

        let Some(frame) = frame::decode(chunk) else {
            warn!("Serial: discarding invalid frame ({} bytes)", chunk.len());
            return None;
        };
        let [b1, b2, b3] = frame.payload;
        info!("Serial: frame {:02X} {:02X} {:02X}", b1, b2, b3);

        match DeviceCommand::from_frame(&frame) {
            Some(cmd) => {
                let ok = self.router.route(cmd);
                info!("Serial: {:?} -> {}", cmd, if ok { "ok" } else { "failed" });
            }
            None => warn!("Serial: unknown command {:02X} {:02X} {:02X}", b1, b2, b3),
        }

        if !self.link.send(&frame::ack_line(&frame)) {
            warn!("Serial: acknowledgement not sent");
        }
        Some(frame)
    }

    /// Read loop. Never returns.
    pub fn run(&self) {
        let mut buf = vec![0u8; self.link.config().rx_buffer_size];
        loop {
            match self.link.read_chunk(&mut buf) {
                Ok(0) => {}
                Ok(n) => {
                    self.handle_chunk(&buf[..n]);
                }
                Err(e) => {
                    warn!("Serial: read failed: {}", e);
                    std::thread::sleep(core::time::Duration::from_millis(u64::from(
                        self.link.config().read_timeout_ms,
                    )));
                }
            }
        }
    }

    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        task_pin::spawn_on_core(Core::App, RX_TASK_PRIORITY, RX_STACK_KB, "serial-rx\0", move || {
            self.run()
        })
    }
}

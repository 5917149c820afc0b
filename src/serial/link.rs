//! Serial link to the display panel.
//!
//! Many senders (sensor pollers, actuator feedback, the dispatcher's
//! acknowledgements) share one UART. `send` serialises them so lines never
//! interleave. The receive task records the most recent inbound chunk for
//! `receive`.

use core::time::Duration;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};

use crate::config::UartConfig;
use crate::error::CommsError;

use super::transport::Transport;

pub struct SerialLink {
    transport: Arc<dyn Transport>,
    tx: Mutex<()>,
    last_message: Mutex<Vec<u8>>,
    config: UartConfig,
}

impl SerialLink {
    pub fn new(transport: Arc<dyn Transport>, config: UartConfig) -> Self {
        Self {
            transport,
            tx: Mutex::new(()),
            last_message: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Write one message. Rejects empty and over-long messages.
    pub fn send(&self, text: &str) -> bool {
        self.try_send(text.as_bytes()).is_ok()
    }

    pub fn try_send(&self, data: &[u8]) -> Result<(), CommsError> {
        if data.is_empty() {
            return Err(CommsError::SerialWriteFailed);
        }
        if data.len() > self.config.send_max_len {
            warn!("Serial: message too long ({} bytes)", data.len());
            return Err(CommsError::MessageTooLong);
        }

        let _tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let mut written = 0;
        while written < data.len() {
            match self.transport.write(&data[written..]) {
                Ok(0) => return Err(CommsError::SerialWriteFailed),
                Ok(n) => written += n,
                Err(e) => {
                    warn!("Serial: write failed: {}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Prefix of the last received message. `0` means the default length;
    /// the length never exceeds the receive buffer.
    pub fn receive(&self, max_len: usize) -> Vec<u8> {
        let max_len = match max_len {
            0 => self.config.receive_default_len,
            n => n.min(self.config.rx_buffer_size),
        };
        let last = self.last_message.lock().unwrap_or_else(PoisonError::into_inner);
        last[..last.len().min(max_len)].to_vec()
    }

    /// Forget the last message and drop any pending input.
    pub fn flush(&self) {
        self.last_message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        if let Err(e) = self.transport.clear_input() {
            warn!("Serial: input flush failed: {}", e);
        }
    }

    pub(crate) fn record(&self, chunk: &[u8]) {
        let mut last = self.last_message.lock().unwrap_or_else(PoisonError::into_inner);
        last.clear();
        last.extend_from_slice(chunk);
        debug!("Serial: received {} bytes", chunk.len());
    }

    pub(crate) fn read_chunk(&self, buf: &mut [u8]) -> Result<usize, CommsError> {
        let timeout = Duration::from_millis(u64::from(self.config.read_timeout_ms));
        self.transport.read(buf, timeout)
    }

    pub fn config(&self) -> &UartConfig {
        &self.config
    }
}

//! Transport abstraction: a full-duplex byte channel.
//!
//! Concrete implementations:
//! - UART1 to the display panel (`adapters::esp_io::UartTransport`)
//! - [`MemoryTransport`] for host tests and the simulation build
//!
//! Reads and writes take `&self` so the receive task and any number of
//! senders can share one transport; the UART driver serialises internally.

use core::time::Duration;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::error::CommsError;

pub trait Transport: Send + Sync {
    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    /// Returns 0 when nothing arrived.
    fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, CommsError>;

    /// Write `data`, returning the number of bytes queued.
    fn write(&self, data: &[u8]) -> Result<usize, CommsError>;

    /// Discard anything buffered on the receive side.
    fn clear_input(&self) -> Result<(), CommsError>;
}

/// Discards all writes and never reads.
pub struct NullTransport;

impl Transport for NullTransport {
    fn read(&self, _buf: &mut [u8], timeout: Duration) -> Result<usize, CommsError> {
        std::thread::sleep(timeout);
        Ok(0)
    }

    fn write(&self, data: &[u8]) -> Result<usize, CommsError> {
        Ok(data.len())
    }

    fn clear_input(&self) -> Result<(), CommsError> {
        Ok(())
    }
}

/// In-memory channel. Each injected chunk is returned by exactly one
/// `read`; writes accumulate until taken.
#[derive(Default)]
pub struct MemoryTransport {
    inbound: Mutex<VecDeque<Vec<u8>>>,
    written: Mutex<Vec<u8>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one chunk for the receive side.
    pub fn inject(&self, chunk: &[u8]) {
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(chunk.to_vec());
    }

    /// Everything written so far, clearing the buffer.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut *self.written.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Written bytes as text.
    pub fn take_text(&self) -> String {
        String::from_utf8_lossy(&self.take_written()).into_owned()
    }
}

impl Transport for MemoryTransport {
    fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, CommsError> {
        let chunk = self
            .inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match chunk {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Ok(n)
            }
            None => {
                std::thread::sleep(timeout);
                Ok(0)
            }
        }
    }

    fn write(&self, data: &[u8]) -> Result<usize, CommsError> {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn clear_input(&self) -> Result<(), CommsError> {
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

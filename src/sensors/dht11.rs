//! DHT11 temperature / humidity sensor on a single open-drain data line.
//!
//! ## Wire protocol
//!
//! ```text
//! host  ▔▔▔╲____20 ms____╱▔30µs▔ (input)
//! dht                            ▔▔╲__80µs__╱▔▔80µs▔▔╲_50µs_╱▔26µs▔╲_50µs_╱▔▔▔70µs▔▔▔╲ ...
//!                                   ack low    ack high   bit = 0         bit = 1
//! ```
//!
//! After the handshake the sensor clocks out 40 bits, MSB first: humidity
//! integer, humidity decimal, temperature integer, temperature decimal,
//! checksum. A bit is sampled 40 µs after its rising edge; still high means
//! `1`.
//!
//! The 40-bit window runs inside a critical section so scheduling jitter
//! cannot stretch a pulse past its timeout. Nothing is logged inside it.

use embedded_hal::delay::DelayNs;
use serde_json::{Value, json};

use crate::app::ports::BitBangLine;
use crate::config::Dht11Config;
use crate::error::{AckPhase, BitEdge, SensorError};

const FRAME_BITS: u8 = 40;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Relative humidity, percent.
    pub humidity: f32,
}

impl ClimateReading {
    /// Broker state payload.
    pub fn to_json(&self) -> Value {
        json!({
            "temperature": round1(self.temperature),
            "humidity": round1(self.humidity),
        })
    }
}

fn round1(v: f32) -> f64 {
    (f64::from(v) * 10.0).round() / 10.0
}

/// Validate the checksum and assemble a reading.
///
/// The checksum is the low byte of the sum of the first four bytes. The
/// DHT11 reports whole units; the decimal bytes are checksummed but unused.
pub fn decode_bytes(data: [u8; 5]) -> Result<ClimateReading, SensorError> {
    let expected = data[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if expected != data[4] {
        return Err(SensorError::Checksum {
            expected,
            received: data[4],
        });
    }
    Ok(ClimateReading {
        humidity: f32::from(data[0]),
        temperature: f32::from(data[2]),
    })
}

pub struct Dht11<L, D> {
    line: L,
    delay: D,
    config: Dht11Config,
}

impl<L, D> Dht11<L, D>
where
    L: BitBangLine,
    D: DelayNs,
{
    pub fn new(line: L, delay: D, config: Dht11Config) -> Self {
        Self {
            line,
            delay,
            config,
        }
    }

    /// One full acquisition: start signal, handshake, 40 bits, checksum.
    pub fn read(&mut self) -> Result<ClimateReading, SensorError> {
        self.start_signal()?;
        let data = critical_section::with(|_| self.read_frame())?;
        decode_bytes(data)
    }

    fn start_signal(&mut self) -> Result<(), SensorError> {
        let c = self.config;
        self.line.set_output_mode().map_err(|_| SensorError::LineFault)?;
        self.line.set_low().map_err(|_| SensorError::LineFault)?;
        self.delay.delay_ms(c.start_low_ms);
        self.line.set_high().map_err(|_| SensorError::LineFault)?;
        self.delay.delay_us(c.release_us);
        self.line.set_input_mode().map_err(|_| SensorError::LineFault)?;
        self.delay.delay_us(c.input_settle_us);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        let ack = self.config.ack_timeout_us;
        let bit_timeout = self.config.bit_timeout_us;

        self.wait_for(false, ack)
            .ok_or(SensorError::NoAck { phase: AckPhase::Low })?;
        self.wait_for(true, ack)
            .ok_or(SensorError::NoAck { phase: AckPhase::High })?;

        let mut data = [0u8; 5];
        for bit in 0..FRAME_BITS {
            self.wait_for(false, bit_timeout).ok_or(SensorError::BitTimeout {
                bit,
                edge: BitEdge::Start,
            })?;
            self.wait_for(true, bit_timeout).ok_or(SensorError::BitTimeout {
                bit,
                edge: BitEdge::Data,
            })?;

            self.delay.delay_us(self.config.sample_delay_us);
            if self.line.is_high().map_err(|_| SensorError::LineFault)? {
                data[usize::from(bit / 8)] |= 1 << (7 - bit % 8);
            }
        }
        Ok(data)
    }

    /// Spin in 1 µs steps until the line reads `high`. Returns the µs waited.
    fn wait_for(&mut self, high: bool, timeout_us: u32) -> Option<u32> {
        let mut elapsed = 0;
        loop {
            match self.line.is_high() {
                Ok(level) if level == high => return Some(elapsed),
                Ok(_) => {}
                Err(_) => return None,
            }
            if elapsed >= timeout_us {
                return None;
            }
            self.delay.delay_us(1);
            elapsed += 1;
        }
    }
}

//! ESP-IDF peripheral bindings for the crate's hardware ports.
//!
//! Outputs that `esp-idf-hal` already exposes through `embedded-hal` 1.0
//! (`PinDriver<Output>` for the lamp and stepper coils, `LedcDriver` for
//! the fan) are used directly. This module covers the rest:
//!
//! | Type             | Implements    | Peripheral                 |
//! |------------------|---------------|----------------------------|
//! | `OpenDrainLine`  | `BitBangLine` | DHT11 data pin             |
//! | `Mq2Adc`         | `AnalogInput` | ADC2 oneshot + curve cal.  |
//! | `UartTransport`  | `Transport`   | UART1 to the display panel |

use core::time::Duration;

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};
use esp_idf_hal::adc::ADC2;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::delay::TickType;
use esp_idf_hal::gpio::{AnyIOPin, Gpio14, InputOutput, PinDriver};
use esp_idf_hal::uart::UartDriver;
use log::warn;

use crate::app::ports::{AnalogInput, BitBangLine};
use crate::error::{CommsError, SensorError};
use crate::serial::transport::Transport;

// ───────────────────────────────────────────────────────────────
// DHT11 data line
// ───────────────────────────────────────────────────────────────

/// Open-drain input/output pin. Driving high releases the line to the
/// pull-up, so "input mode" is simply a released output.
pub struct OpenDrainLine {
    pin: PinDriver<'static, AnyIOPin, InputOutput>,
}

impl OpenDrainLine {
    pub fn new(pin: AnyIOPin) -> Result<Self, esp_idf_svc::sys::EspError> {
        let mut pin = PinDriver::input_output_od(pin)?;
        pin.set_high()?;
        Ok(Self { pin })
    }
}

impl ErrorType for OpenDrainLine {
    type Error = ErrorKind;
}

impl InputPin for OpenDrainLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_low())
    }
}

impl OutputPin for OpenDrainLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low().map_err(|_| ErrorKind::Other)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high().map_err(|_| ErrorKind::Other)
    }
}

impl BitBangLine for OpenDrainLine {
    fn set_output_mode(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_input_mode(&mut self) -> Result<(), Self::Error> {
        self.set_high()
    }
}

// ───────────────────────────────────────────────────────────────
// MQ-2 analog channel
// ───────────────────────────────────────────────────────────────

/// ADC2 channel 3 (GPIO14), 11 dB attenuation, curve-fitting calibration.
pub struct Mq2Adc {
    channel: AdcChannelDriver<'static, Gpio14, AdcDriver<'static, ADC2>>,
}

impl Mq2Adc {
    pub fn new(
        channel: AdcChannelDriver<'static, Gpio14, AdcDriver<'static, ADC2>>,
    ) -> Self {
        Self { channel }
    }
}

impl AnalogInput for Mq2Adc {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        self.channel.read_raw().map_err(|e| {
            warn!("MQ-2: ADC read failed: {:?}", e);
            SensorError::AdcReadFailed
        })
    }

    fn calibrated_millivolts(&mut self, raw: u16) -> Option<u32> {
        self.channel.raw_to_mv(raw).ok().map(u32::from)
    }
}

// ───────────────────────────────────────────────────────────────
// Panel UART
// ───────────────────────────────────────────────────────────────

pub struct UartTransport {
    uart: UartDriver<'static>,
}

impl UartTransport {
    pub fn new(uart: UartDriver<'static>) -> Self {
        Self { uart }
    }
}

impl Transport for UartTransport {
    fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, CommsError> {
        self.uart
            .read(buf, TickType::from(timeout).ticks())
            .map_err(|_| CommsError::SerialReadFailed)
    }

    fn write(&self, data: &[u8]) -> Result<usize, CommsError> {
        self.uart
            .write(data)
            .map_err(|_| CommsError::SerialWriteFailed)
    }

    fn clear_input(&self) -> Result<(), CommsError> {
        self.uart
            .clear_rx()
            .map_err(|_| CommsError::SerialReadFailed)
    }
}

//! Relay-switched lamp. Binary power, no level.

use std::sync::{Arc, Mutex, PoisonError};

use embedded_hal::digital::{OutputPin, PinState};
use log::{info, warn};
use serde_json::{Value, json};

use crate::app::events::DeviceEvent;
use crate::app::ports::EventSink;
use crate::error::{ActuatorError, Error};

trait SwitchOutput: Send {
    fn write(&mut self, on: bool) -> Result<(), ActuatorError>;
}

impl<P: OutputPin + Send> SwitchOutput for P {
    fn write(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.set_state(PinState::from(on))
            .map_err(|_| ActuatorError::GpioWriteFailed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LampSnapshot {
    pub on: bool,
}

impl LampSnapshot {
    pub fn to_json(&self) -> Value {
        json!({ "state": if self.on { "ON" } else { "OFF" } })
    }
}

struct Inner {
    output: Box<dyn SwitchOutput>,
    on: bool,
}

pub struct Lamp {
    inner: Mutex<Inner>,
    sink: Arc<dyn EventSink>,
}

impl Lamp {
    /// Take the relay pin and switch it off.
    pub fn new<P>(pin: P, sink: Arc<dyn EventSink>) -> Result<Self, Error>
    where
        P: OutputPin + Send + 'static,
    {
        let mut output: Box<dyn SwitchOutput> = Box::new(pin);
        output.write(false)?;
        Ok(Self {
            inner: Mutex::new(Inner { output, on: false }),
            sink,
        })
    }

    pub fn set(&self, on: bool) -> Result<LampSnapshot, Error> {
        let snapshot = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = inner.output.write(on) {
                warn!("Lamp: relay write failed: {}", e);
                return Err(e.into());
            }
            inner.on = on;
            LampSnapshot { on }
        };

        info!("Lamp: {}", if on { "ON" } else { "OFF" });
        self.sink.emit(&DeviceEvent::Lamp(snapshot));
        Ok(snapshot)
    }

    pub fn turn_on(&self) -> Result<LampSnapshot, Error> {
        self.set(true)
    }

    pub fn turn_off(&self) -> Result<LampSnapshot, Error> {
        self.set(false)
    }

    pub fn snapshot(&self) -> LampSnapshot {
        LampSnapshot {
            on: self.inner.lock().unwrap_or_else(PoisonError::into_inner).on,
        }
    }

    /// Command topic payload: `ON` / `OFF`.
    pub fn apply_command(&self, payload: &str) -> Result<LampSnapshot, Error> {
        match payload.trim() {
            "ON" => self.turn_on(),
            "OFF" => self.turn_off(),
            _ => Err(Error::Protocol("lamp command must be ON or OFF")),
        }
    }
}

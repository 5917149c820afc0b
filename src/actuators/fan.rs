//! PWM fan with four discrete speed levels.
//!
//! A level change is an instantaneous duty write, so there is no task or
//! queue: every call takes the internal lock, writes the duty, publishes.
//! Concurrent callers serialise on the lock and the last one wins.

use std::sync::{Arc, Mutex, PoisonError};

use embedded_hal::pwm::SetDutyCycle;
use log::{info, warn};
use serde_json::{Value, json};

use crate::app::events::DeviceEvent;
use crate::app::ports::EventSink;
use crate::config::FanConfig;
use crate::error::{ActuatorError, Error};

pub const MAX_LEVEL: u8 = 3;

/// Duty written out of this range: 0..=255.
const DUTY_SCALE: u16 = 255;

/// Object-safe view of a PWM channel so the fan is not generic over it.
trait DutyOutput: Send {
    fn write_duty(&mut self, duty: u8) -> Result<(), ActuatorError>;
}

impl<P: SetDutyCycle + Send> DutyOutput for P {
    fn write_duty(&mut self, duty: u8) -> Result<(), ActuatorError> {
        self.set_duty_cycle_fraction(u16::from(duty), DUTY_SCALE)
            .map_err(|_| ActuatorError::PwmWriteFailed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanSnapshot {
    pub level: u8,
    pub duty: u8,
}

impl FanSnapshot {
    pub fn is_on(&self) -> bool {
        self.level > 0
    }

    pub fn to_json(&self) -> Value {
        json!({
            "state": if self.is_on() { "ON" } else { "OFF" },
            "speed": self.level,
        })
    }
}

struct Inner {
    output: Box<dyn DutyOutput>,
    state: FanSnapshot,
}

pub struct Fan {
    inner: Mutex<Inner>,
    config: FanConfig,
    sink: Arc<dyn EventSink>,
}

impl Fan {
    /// Take the PWM channel and drive it to level 0.
    pub fn new<P>(pwm: P, config: FanConfig, sink: Arc<dyn EventSink>) -> Result<Self, Error>
    where
        P: SetDutyCycle + Send + 'static,
    {
        let mut output: Box<dyn DutyOutput> = Box::new(pwm);
        output.write_duty(config.level_duty[0])?;
        Ok(Self {
            inner: Mutex::new(Inner {
                output,
                state: FanSnapshot {
                    level: 0,
                    duty: config.level_duty[0],
                },
            }),
            config,
            sink,
        })
    }

    /// Set speed level 0..=3. Values above 3 clamp to 3.
    pub fn set_level(&self, level: u8) -> Result<FanSnapshot, Error> {
        let level = level.min(MAX_LEVEL);
        let duty = self.config.level_duty[usize::from(level)];

        let snapshot = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = inner.output.write_duty(duty) {
                warn!("Fan: duty write failed at level {}: {}", level, e);
                return Err(e.into());
            }
            inner.state = FanSnapshot { level, duty };
            inner.state
        };

        info!("Fan: level {} (duty {})", level, duty);
        self.sink.emit(&DeviceEvent::Fan(snapshot));
        Ok(snapshot)
    }

    /// On at the configured default level.
    pub fn turn_on(&self) -> Result<FanSnapshot, Error> {
        self.set_level(self.config.default_level)
    }

    pub fn turn_off(&self) -> Result<FanSnapshot, Error> {
        self.set_level(0)
    }

    pub fn snapshot(&self) -> FanSnapshot {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).state
    }

    /// Command topic payload: `ON` / `OFF`.
    pub fn apply_command(&self, payload: &str) -> Result<FanSnapshot, Error> {
        match payload.trim() {
            "ON" => self.turn_on(),
            "OFF" => self.turn_off(),
            _ => Err(Error::Protocol("fan command must be ON or OFF")),
        }
    }

    /// Percentage topic payload: `0`..`3`.
    pub fn apply_speed(&self, payload: &str) -> Result<FanSnapshot, Error> {
        match payload.trim().parse::<u8>() {
            Ok(level) if level <= MAX_LEVEL => self.set_level(level),
            _ => Err(Error::Protocol("fan speed must be 0..3")),
        }
    }
}

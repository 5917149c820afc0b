//! Unified error types for the RoomHub firmware.
//!
//! A single `Error` enum that every subsystem can convert into. All
//! variants are `Copy` so they can be handed between tasks and cached
//! beside readings without allocation.
//!
//! Conflicting-command rejections ("busy", "queue full") are not errors in
//! this sense; they live in [`crate::actuators::Rejection`] so callers can
//! tell "try later" apart from a hardware fault.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned invalid data.
    Sensor(SensorError),
    /// An actuator output could not be driven.
    Actuator(ActuatorError),
    /// Broker or serial communication failed.
    Comms(CommsError),
    /// A received frame or payload was malformed.
    Protocol(&'static str),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

/// Which handshake pulse the DHT11 failed to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckPhase {
    /// The sensor never pulled the line low after the start signal.
    Low,
    /// The sensor pulled low but never released it high.
    High,
}

/// Which edge of a data bit window timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitEdge {
    /// Waiting for the low preamble that opens the bit.
    Start,
    /// Waiting for the high pulse that carries the value.
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// No acknowledgement pulse after the start signal.
    NoAck { phase: AckPhase },
    /// A bit edge did not arrive within its timeout.
    BitTimeout { bit: u8, edge: BitEdge },
    /// The fifth byte did not match the sum of the first four.
    Checksum { expected: u8, received: u8 },
    /// ADC read returned an error.
    AdcReadFailed,
    /// The GPIO line could not be driven or sampled.
    LineFault,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAck { phase: AckPhase::Low } => write!(f, "no acknowledgement (low)"),
            Self::NoAck { phase: AckPhase::High } => write!(f, "no acknowledgement (high)"),
            Self::BitTimeout { bit, edge: BitEdge::Start } => {
                write!(f, "timeout waiting for bit {bit} start")
            }
            Self::BitTimeout { bit, edge: BitEdge::Data } => {
                write!(f, "timeout waiting for bit {bit} data")
            }
            Self::Checksum { expected, received } => {
                write!(f, "checksum error: {expected} != {received}")
            }
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::LineFault => write!(f, "GPIO line fault"),
        }
    }
}

impl std::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// PWM duty-cycle write failed.
    PwmWriteFailed,
    /// GPIO set failed.
    GpioWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl std::error::Error for ActuatorError {}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// Broker session is not established.
    NotConnected,
    /// The network layer has not reported readiness yet.
    NetworkNotReady,
    /// Broker client could not be started.
    ConnectFailed,
    PublishFailed,
    SubscribeFailed,
    SerialReadFailed,
    SerialWriteFailed,
    /// Outgoing serial message exceeds the send limit.
    MessageTooLong,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "broker not connected"),
            Self::NetworkNotReady => write!(f, "network not ready"),
            Self::ConnectFailed => write!(f, "broker connect failed"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::SerialReadFailed => write!(f, "serial read failed"),
            Self::SerialWriteFailed => write!(f, "serial write failed"),
            Self::MessageTooLong => write!(f, "message too long"),
        }
    }
}

impl std::error::Error for CommsError {}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

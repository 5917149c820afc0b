//! Actuators: curtain stepper, fan PWM, lamp relay.
//!
//! | Actuator  | Action        | Concurrency model                          |
//! |-----------|---------------|--------------------------------------------|
//! | `curtain` | seconds-long  | own task + bounded queue + abort checkpoint |
//! | `fan`     | instantaneous | internal mutex, state changes synchronously |
//! | `lamp`    | instantaneous | internal mutex, state changes synchronously |
//!
//! Every public method takes `&self` and is safe to call from any task.
//! Hardware handles are owned by exactly one actuator and never leave it.

pub mod curtain;
pub mod fan;
pub mod lamp;
pub mod runtime;

use core::fmt;

/// Successful result of a control-surface request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A long-running command was queued and will execute on the task.
    Started,
    /// The state changed synchronously.
    Applied,
    /// Target already reached; nothing was queued.
    AlreadyOpen,
    AlreadyClosed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Applied => "applied",
            Self::AlreadyOpen => "already_open",
            Self::AlreadyClosed => "already_closed",
        }
    }
}

/// A request the actuator refused. "Try later", not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// A directional command is already executing or queued.
    Busy { actuator: &'static str },
    /// The command queue has no free slot.
    QueueFull,
}

impl Rejection {
    /// Stable reason string for control-surface callers.
    pub fn reason(self) -> String {
        match self {
            Self::Busy { actuator } => format!("{actuator}_is_running"),
            Self::QueueFull => "queue_full".into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason())
    }
}

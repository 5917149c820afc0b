//! Motorised curtain on a half-step stepper.
//!
//! A full stroke is thousands of steps at a few milliseconds each, so the
//! curtain runs on the [actuator task runtime](super::runtime): commands
//! are queued, the stroke runs on its own thread, and a `Stop` is observed
//! at a checkpoint every `abort_check_interval` steps.
//!
//! Position bookkeeping is open-loop. After an aborted stroke the position
//! is [`CurtainPosition::Unknown`] and both directions are allowed again.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::{Arc, Mutex, PoisonError};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::app::events::DeviceEvent;
use crate::app::ports::EventSink;
use crate::config::CurtainConfig;
use crate::drivers::stepper::{Direction, HalfStepper};
use crate::error::Error;

use super::runtime::{ActuatorCommand, ActuatorTask, Checkpoint, Completion, Runtime, TaskPhase};
use super::{Outcome, Rejection};

/// Closing turns the shaft clockwise.
const CLOSE_DIRECTION: Direction = Direction::Forward;
const OPEN_DIRECTION: Direction = Direction::Reverse;

const TASK_PRIORITY: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurtainPosition {
    Open,
    Closed,
    /// A stroke was interrupted; the physical position is not known.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Idle,
    Opening,
    Closing,
}

/// Published curtain state. Only the curtain task writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurtainSnapshot {
    pub position: CurtainPosition,
    pub motion: Motion,
    /// Steps completed in the current (or last) stroke.
    pub current_step: u32,
}

impl CurtainSnapshot {
    pub fn is_running(&self) -> bool {
        self.motion != Motion::Idle
    }

    /// `opening` / `closing` while moving, otherwise the position.
    pub fn state_str(&self) -> &'static str {
        match (self.motion, self.position) {
            (Motion::Opening, _) => "opening",
            (Motion::Closing, _) => "closing",
            (Motion::Idle, CurtainPosition::Open) => "open",
            (Motion::Idle, CurtainPosition::Closed) => "closed",
            (Motion::Idle, CurtainPosition::Unknown) => "unknown",
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "is_running": self.is_running(),
            "state": self.state_str(),
            "current_step": self.current_step,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurtainCommand {
    Open,
    Close,
    Stop,
}

impl ActuatorCommand for CurtainCommand {
    fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

impl CurtainCommand {
    /// Parse a broker payload (`OPEN` / `CLOSE` / `STOP`).
    pub fn from_payload(payload: &str) -> Option<Self> {
        match payload.trim() {
            "OPEN" => Some(Self::Open),
            "CLOSE" => Some(Self::Close),
            "STOP" => Some(Self::Stop),
            _ => None,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Shared state (handle ↔ task)
// ───────────────────────────────────────────────────────────────

struct Shared {
    snapshot: Mutex<CurtainSnapshot>,
    /// Set by the handle when a stroke is accepted, cleared by the task when
    /// it ends. Makes busy-rejection atomic with the enqueue.
    stroke_claimed: AtomicBool,
}

impl Shared {
    fn read(&self) -> CurtainSnapshot {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut CurtainSnapshot)) -> CurtainSnapshot {
        let mut guard = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
        *guard
    }
}

// ───────────────────────────────────────────────────────────────
// Task half (owns the coils)
// ───────────────────────────────────────────────────────────────

struct CurtainTask<P, D> {
    stepper: HalfStepper<P>,
    delay: D,
    config: CurtainConfig,
    shared: Arc<Shared>,
    sink: Arc<dyn EventSink>,
}

impl<P, D> CurtainTask<P, D>
where
    P: OutputPin + Send + 'static,
    D: DelayNs + Send + 'static,
{
    fn publish(&self, f: impl FnOnce(&mut CurtainSnapshot)) {
        let snapshot = self.shared.update(f);
        // Lock released before fan-out; sinks may block on I/O.
        self.sink.emit(&DeviceEvent::Curtain(snapshot));
    }

    fn release_coils(&mut self) {
        if let Err(e) = self.stepper.release() {
            warn!("Curtain: coil release failed: {}", e);
        }
    }

    fn stroke(
        &mut self,
        direction: Direction,
        checkpoint: &Checkpoint<'_, CurtainCommand>,
    ) -> (Completion, u32) {
        let steps = self.config.steps_per_stroke;
        let interval = self.config.abort_check_interval.max(1);

        for step in 0..steps {
            if step % interval == 0 && checkpoint.should_abort() {
                info!("Curtain: stop received at step {}/{}", step, steps);
                return (Completion::Aborted, step);
            }
            if let Err(e) = self.stepper.step(direction) {
                warn!("Curtain: step {} failed: {}", step, e);
                return (Completion::Aborted, step);
            }
            self.delay.delay_ms(self.config.step_delay_ms);
            self.shared.update(|s| s.current_step = step + 1);
        }
        (Completion::Finished, steps)
    }
}

impl<P, D> ActuatorTask for CurtainTask<P, D>
where
    P: OutputPin + Send + 'static,
    D: DelayNs + Send + 'static,
{
    type Command = CurtainCommand;

    fn execute(
        &mut self,
        cmd: CurtainCommand,
        checkpoint: &Checkpoint<'_, CurtainCommand>,
    ) -> Completion {
        let (direction, motion, target) = match cmd {
            CurtainCommand::Open => (OPEN_DIRECTION, Motion::Opening, CurtainPosition::Open),
            CurtainCommand::Close => (CLOSE_DIRECTION, Motion::Closing, CurtainPosition::Closed),
            CurtainCommand::Stop => {
                self.stop();
                return Completion::Finished;
            }
        };

        info!("Curtain: {:?} ({} steps)", motion, self.config.steps_per_stroke);
        self.publish(|s| {
            s.motion = motion;
            s.current_step = 0;
        });

        let (completion, done) = self.stroke(direction, checkpoint);
        self.release_coils();

        let position = match completion {
            Completion::Finished => target,
            Completion::Aborted => CurtainPosition::Unknown,
        };
        let claim = &self.shared.stroke_claimed;
        self.publish(|s| {
            s.motion = Motion::Idle;
            s.position = position;
            s.current_step = done;
            // Released under the snapshot lock: anyone who sees the final
            // position may claim the next stroke.
            claim.store(false, Ordering::Release);
        });
        info!("Curtain: {:?} after {} steps", position, done);
        completion
    }

    fn stop(&mut self) {
        self.release_coils();
        self.publish(|s| s.motion = Motion::Idle);
    }
}

// ───────────────────────────────────────────────────────────────
// Public handle
// ───────────────────────────────────────────────────────────────

/// Thread-safe curtain handle. Cloning shares the same task.
#[derive(Clone)]
pub struct Curtain {
    runtime: Arc<Runtime<CurtainCommand>>,
    shared: Arc<Shared>,
}

impl Curtain {
    /// Take ownership of the stepper and start the curtain task.
    pub fn spawn<P, D>(
        stepper: HalfStepper<P>,
        delay: D,
        config: CurtainConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<(Self, std::thread::JoinHandle<()>), Error>
    where
        P: OutputPin + Send + 'static,
        D: DelayNs + Send + 'static,
    {
        let shared = Arc::new(Shared {
            snapshot: Mutex::new(CurtainSnapshot {
                position: config.initial_position,
                motion: Motion::Idle,
                current_step: 0,
            }),
            stroke_claimed: AtomicBool::new(false),
        });
        let runtime = Runtime::new();
        let task = CurtainTask {
            stepper,
            delay,
            config,
            shared: Arc::clone(&shared),
            sink,
        };
        let wait = Duration::from_millis(u64::from(config.queue_wait_ms));
        let handle = runtime
            .spawn(task, "curtain\0", TASK_PRIORITY, wait)
            .map_err(|_| Error::Init("curtain task spawn failed"))?;
        Ok((Self { runtime, shared }, handle))
    }

    pub fn open(&self) -> Result<Outcome, Rejection> {
        self.request(CurtainCommand::Open, CurtainPosition::Open, Outcome::AlreadyOpen)
    }

    pub fn close(&self) -> Result<Outcome, Rejection> {
        self.request(CurtainCommand::Close, CurtainPosition::Closed, Outcome::AlreadyClosed)
    }

    /// Request a stop. A stroke accepted but not yet started is withdrawn
    /// so the stop always gets the slot. `false` once shut down.
    pub fn stop(&self) -> bool {
        if self.runtime.enqueue(CurtainCommand::Stop) {
            return true;
        }
        if let Some(queued) = self.runtime.take_pending() {
            if !queued.is_stop() {
                info!("Curtain: {:?} withdrawn before it started", queued);
                self.shared.stroke_claimed.store(false, Ordering::Release);
            }
        }
        self.runtime.enqueue(CurtainCommand::Stop)
    }

    /// Route a parsed command to the matching operation.
    pub fn command(&self, cmd: CurtainCommand) -> Result<Outcome, Rejection> {
        match cmd {
            CurtainCommand::Open => self.open(),
            CurtainCommand::Close => self.close(),
            CurtainCommand::Stop => {
                if self.stop() {
                    Ok(Outcome::Started)
                } else {
                    Err(Rejection::QueueFull)
                }
            }
        }
    }

    pub fn snapshot(&self) -> CurtainSnapshot {
        self.shared.read()
    }

    pub fn phase(&self) -> TaskPhase {
        self.runtime.phase()
    }

    /// Let the task thread exit once idle.
    pub fn shutdown(&self) {
        self.runtime.shutdown();
    }

    fn request(
        &self,
        cmd: CurtainCommand,
        target: CurtainPosition,
        already: Outcome,
    ) -> Result<Outcome, Rejection> {
        if self
            .shared
            .stroke_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Rejection::Busy { actuator: "curtain" });
        }

        // No stroke is running or queued past this point.
        if self.shared.read().position == target {
            self.shared.stroke_claimed.store(false, Ordering::Release);
            return Ok(already);
        }

        if !self.runtime.enqueue(cmd) {
            self.shared.stroke_claimed.store(false, Ordering::Release);
            return Err(Rejection::QueueFull);
        }
        Ok(Outcome::Started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_string_prefers_motion() {
        let s = CurtainSnapshot {
            position: CurtainPosition::Open,
            motion: Motion::Closing,
            current_step: 12,
        };
        assert_eq!(s.state_str(), "closing");
        assert!(s.is_running());
        let json = s.to_json();
        assert_eq!(json["state"], "closing");
        assert_eq!(json["current_step"], 12);
        assert_eq!(json["is_running"], true);
    }

    #[test]
    fn idle_unknown_is_reported() {
        let s = CurtainSnapshot {
            position: CurtainPosition::Unknown,
            motion: Motion::Idle,
            current_step: 300,
        };
        assert_eq!(s.state_str(), "unknown");
        assert!(!s.is_running());
    }

    #[test]
    fn broker_payloads() {
        assert_eq!(CurtainCommand::from_payload("OPEN"), Some(CurtainCommand::Open));
        assert_eq!(CurtainCommand::from_payload(" STOP\n"), Some(CurtainCommand::Stop));
        assert_eq!(CurtainCommand::from_payload("open"), None);
    }
}

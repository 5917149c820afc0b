//! Actuator task runtime: one background task and one bounded queue per
//! physical output.
//!
//! ```text
//!  caller ──enqueue──▶ ┌──────────────┐  recv (bounded wait)  ┌────────────┐
//!  (any task)          │ queued slot  │──────────────────────▶│ task loop  │──▶ coils / PWM
//!                      └──────────────┘                       │ (in-flight)│
//!                       stop counter ◀── checkpoint every N ──└────────────┘
//! ```
//!
//! Capacity is two: the command the task is executing plus one queued
//! behind it. `enqueue` never blocks; a full queue is reported to the
//! caller as `false`.
//!
//! Cancellation is cooperative. A `Stop` bumps a pending-stop counter
//! before it lands in the queue; long sequences poll that counter at their
//! checkpoints through [`Checkpoint::should_abort`]. Worst-case stop
//! latency is therefore one checkpoint interval, not immediate.

use core::fmt::Debug;
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use core::time::Duration;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use futures_lite::future;
use log::{debug, info};

use crate::drivers::task_pin::{self, Core};

/// Commands that may wait behind the one in flight.
pub const QUEUED_DEPTH: usize = 1;

/// Vocabulary of an actuator's queue. Exactly one variant is the stop.
pub trait ActuatorCommand: Copy + Send + Debug + 'static {
    fn is_stop(&self) -> bool;
}

/// Lifecycle of the task loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskPhase {
    /// Waiting on the queue; outputs de-energised or holding.
    Idle = 0,
    /// Executing a directional command.
    Running = 1,
    /// A stop was observed mid-sequence; outputs are being released.
    Aborting = 2,
}

impl TaskPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Aborting,
            _ => Self::Idle,
        }
    }
}

/// How a directional command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Ran to its nominal end state.
    Finished,
    /// Cut short by a stop at a checkpoint.
    Aborted,
}

/// The hardware-owning half of an actuator. Lives on the task thread and is
/// never shared.
pub trait ActuatorTask: Send + 'static {
    type Command: ActuatorCommand;

    /// Execute one non-stop command. Long sequences must call
    /// [`Checkpoint::should_abort`] periodically and return
    /// [`Completion::Aborted`] (outputs released) when it says so.
    fn execute(&mut self, cmd: Self::Command, checkpoint: &Checkpoint<'_, Self::Command>)
    -> Completion;

    /// A stop arrived while idle: make sure outputs are released and
    /// publish state.
    fn stop(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Command queue
// ───────────────────────────────────────────────────────────────

/// Bounded command queue with a stop counter.
pub struct CommandQueue<C> {
    slot: Channel<CriticalSectionRawMutex, C, QUEUED_DEPTH>,
    /// Stops enqueued (or being enqueued) and not yet consumed.
    pending_stops: AtomicUsize,
    closed: AtomicBool,
}

impl<C: ActuatorCommand> CommandQueue<C> {
    pub const fn new() -> Self {
        Self {
            slot: Channel::new(),
            pending_stops: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Non-blocking submit. `false` when the queue is full or closed.
    pub fn enqueue(&self, cmd: C) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        let stop = cmd.is_stop();
        // Counted before the send so a checkpoint can never miss a stop
        // that is already sitting in the slot.
        if stop {
            self.pending_stops.fetch_add(1, Ordering::AcqRel);
        }
        if self.slot.try_send(cmd).is_ok() {
            return true;
        }
        if stop {
            self.release_stop();
        }
        false
    }

    /// Wait up to `timeout` for the next command.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<C> {
        let cmd = future::block_on(future::or(
            async { Some(self.slot.receive().await) },
            async {
                async_io_mini::Timer::after(timeout).await;
                None
            },
        ))?;
        if cmd.is_stop() {
            self.release_stop();
        }
        Some(cmd)
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> Option<C> {
        let cmd = self.slot.try_receive().ok()?;
        if cmd.is_stop() {
            self.release_stop();
        }
        Some(cmd)
    }

    /// A stop is queued or about to be.
    pub fn stop_pending(&self) -> bool {
        self.pending_stops.load(Ordering::Acquire) > 0
    }

    /// Drop everything queued. Returns how many commands were discarded.
    pub fn discard_pending(&self) -> usize {
        let mut dropped = 0;
        while self.try_recv().is_some() {
            dropped += 1;
        }
        dropped
    }

    /// Refuse further commands; the task loop exits on its next idle wait.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn release_stop(&self) {
        // Saturating: never wrap below zero if a drain races an enqueue.
        let _ = self
            .pending_stops
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }
}

impl<C: ActuatorCommand> Default for CommandQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Checkpoint (handed to long-running sequences)
// ───────────────────────────────────────────────────────────────

/// Abort check for a running sequence.
pub struct Checkpoint<'a, C> {
    runtime: &'a Runtime<C>,
}

impl<C: ActuatorCommand> Checkpoint<'_, C> {
    /// `true` when a stop is pending. The stop (and anything queued with
    /// it) is consumed and the phase moves to [`TaskPhase::Aborting`]; the
    /// caller must release outputs and return [`Completion::Aborted`].
    pub fn should_abort(&self) -> bool {
        if !self.runtime.queue.stop_pending() {
            return false;
        }
        self.runtime.set_phase(TaskPhase::Aborting);
        let dropped = self.runtime.queue.discard_pending();
        debug!("actuator: abort at checkpoint ({} queued dropped)", dropped);
        true
    }
}

// ───────────────────────────────────────────────────────────────
// Runtime (shared between the task thread and the public handle)
// ───────────────────────────────────────────────────────────────

/// Queue plus published phase for one actuator.
pub struct Runtime<C> {
    queue: CommandQueue<C>,
    phase: AtomicU8,
}

impl<C: ActuatorCommand> Runtime<C> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: CommandQueue::new(),
            phase: AtomicU8::new(TaskPhase::Idle as u8),
        })
    }

    pub fn enqueue(&self, cmd: C) -> bool {
        self.queue.enqueue(cmd)
    }

    /// Pull the queued command back out before the task picks it up.
    pub fn take_pending(&self) -> Option<C> {
        self.queue.try_recv()
    }

    pub fn phase(&self) -> TaskPhase {
        TaskPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Stop accepting commands and let the task thread exit.
    pub fn shutdown(&self) {
        self.queue.close();
    }

    /// Task loop. Blocks until [`shutdown`](Self::shutdown) is called and
    /// the queue drains.
    pub fn run<T>(&self, mut task: T, wait: Duration)
    where
        T: ActuatorTask<Command = C>,
    {
        loop {
            let Some(cmd) = self.queue.recv_timeout(wait) else {
                if self.queue.is_closed() {
                    break;
                }
                continue;
            };

            if cmd.is_stop() {
                let dropped = self.queue.discard_pending();
                debug!("actuator: stop while idle ({} queued dropped)", dropped);
                task.stop();
                self.set_phase(TaskPhase::Idle);
                continue;
            }

            self.set_phase(TaskPhase::Running);
            let completion = task.execute(cmd, &Checkpoint { runtime: self });
            debug!("actuator: {:?} -> {:?}", cmd, completion);
            self.set_phase(TaskPhase::Idle);
        }
        info!("actuator: task loop exited");
    }

    /// Run the task loop on its own thread.
    pub fn spawn<T>(
        self: &Arc<Self>,
        task: T,
        name: &'static str,
        priority: u8,
        wait: Duration,
    ) -> std::io::Result<std::thread::JoinHandle<()>>
    where
        T: ActuatorTask<Command = C>,
    {
        let runtime = Arc::clone(self);
        task_pin::spawn_on_core(Core::App, priority, 4, name, move || runtime.run(task, wait))
    }

    fn set_phase(&self, phase: TaskPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }
}

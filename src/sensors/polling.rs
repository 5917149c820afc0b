//! Sensor polling engine: one fixed-interval async loop per sensor.
//!
//! ```text
//!  ┌──────────────────────────┐   ┌──────────────────────────┐
//!  │  "dht11" thread          │   │  "mq2" thread            │
//!  │  LocalExecutor           │   │  LocalExecutor           │
//!  │  2 s, then every 5 s ⏱   │   │  preheat, every 5 s ⏱    │
//!  └────────────┬─────────────┘   └────────────┬─────────────┘
//!               ▼                              ▼
//!        SensorCache + EventSink (broker, panel, automation)
//! ```
//!
//! A failed read leaves the cache untouched and is logged; the loop sleeps
//! the full interval either way. The interval sleep is the only retry.

use core::future::Future;
use core::pin::Pin;
use core::time::Duration;
use std::sync::Arc;
use std::thread::JoinHandle;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::events::DeviceEvent;
use crate::app::ports::{AnalogInput, BitBangLine, EventSink};
use crate::drivers::task_pin::{self, Core};
use crate::error::SensorError;

use super::SensorCache;
use super::dht11::{ClimateReading, Dht11};
use super::mq2::{Mq2, SmokeReading};

const SENSOR_TASK_PRIORITY: u8 = 5;
const SENSOR_STACK_KB: usize = 6;

/// One acquisition routine the engine can drive.
pub trait Acquisition: Send + 'static {
    type Output: Copy + Send + 'static;

    fn name(&self) -> &'static str;

    /// NUL-terminated name for this sensor's thread.
    fn thread_name(&self) -> &'static str;

    fn acquire(&mut self) -> Result<Self::Output, SensorError>;

    /// Wrap a fresh reading for the event sinks.
    fn event(reading: Self::Output) -> DeviceEvent;
}

impl<L, D> Acquisition for Dht11<L, D>
where
    L: BitBangLine + Send + 'static,
    D: DelayNs + Send + 'static,
{
    type Output = ClimateReading;

    fn name(&self) -> &'static str {
        "DHT11"
    }

    fn thread_name(&self) -> &'static str {
        "dht11\0"
    }

    fn acquire(&mut self) -> Result<ClimateReading, SensorError> {
        self.read()
    }

    fn event(reading: ClimateReading) -> DeviceEvent {
        DeviceEvent::Climate(reading)
    }
}

impl<A, D> Acquisition for Mq2<A, D>
where
    A: AnalogInput + Send + 'static,
    D: DelayNs + Send + 'static,
{
    type Output = SmokeReading;

    fn name(&self) -> &'static str {
        "MQ-2"
    }

    fn thread_name(&self) -> &'static str {
        "mq2\0"
    }

    fn acquire(&mut self) -> Result<SmokeReading, SensorError> {
        self.read()
    }

    fn event(reading: SmokeReading) -> DeviceEvent {
        DeviceEvent::Smoke(reading)
    }
}

// ───────────────────────────────────────────────────────────────
// Poller
// ───────────────────────────────────────────────────────────────

pub struct Poller<S: Acquisition> {
    sensor: S,
    cache: Arc<SensorCache<S::Output>>,
    sink: Arc<dyn EventSink>,
    /// Wait before the first read (stabilise / preheat).
    warmup: Duration,
    interval: Duration,
}

impl<S: Acquisition> Poller<S> {
    pub fn new(
        sensor: S,
        cache: Arc<SensorCache<S::Output>>,
        sink: Arc<dyn EventSink>,
        warmup: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            sensor,
            cache,
            sink,
            warmup,
            interval,
        }
    }

    /// Read once. Success updates the cache and emits; failure only logs.
    pub fn poll_once(&mut self) -> Result<S::Output, SensorError> {
        match self.sensor.acquire() {
            Ok(reading) => {
                self.cache.store(reading);
                self.sink.emit(&S::event(reading));
                Ok(reading)
            }
            Err(e) => {
                warn!("{}: read failed: {} (keeping last reading)", self.sensor.name(), e);
                Err(e)
            }
        }
    }

    /// Warm up, read once, then poll every `interval` forever.
    pub async fn run(mut self) {
        if !self.warmup.is_zero() {
            debug!("{}: warming up for {:?}", self.sensor.name(), self.warmup);
            async_io_mini::Timer::after(self.warmup).await;
        }
        info!("{}: polling every {:?}", self.sensor.name(), self.interval);

        // First read before the loop; a failure here does not hold it up.
        let _ = self.poll_once();
        loop {
            async_io_mini::Timer::after(self.interval).await;
            let _ = self.poll_once();
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Sensor thread
// ───────────────────────────────────────────────────────────────

struct PollJob {
    /// NUL-terminated thread name.
    thread: &'static str,
    future: Pin<Box<dyn Future<Output = ()> + Send>>,
}

/// Collects pollers and gives each one its own thread, so a blocking
/// acquisition on one sensor never delays another.
#[derive(Default)]
pub struct SensorTasks {
    jobs: Vec<PollJob>,
}

impl SensorTasks {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    pub fn with<S: Acquisition>(mut self, poller: Poller<S>) -> Self {
        self.jobs.push(PollJob {
            thread: poller.sensor.thread_name(),
            future: Box::pin(poller.run()),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Spawn one sensor thread per poller on the application core.
    pub fn spawn(self) -> std::io::Result<Vec<JoinHandle<()>>> {
        self.jobs
            .into_iter()
            .map(|job| {
                task_pin::spawn_on_core(
                    Core::App,
                    SENSOR_TASK_PRIORITY,
                    SENSOR_STACK_KB,
                    job.thread,
                    move || run_poller(job),
                )
            })
            .collect()
    }
}

fn run_poller(job: PollJob) {
    let executor: edge_executor::LocalExecutor<'_, 1> = edge_executor::LocalExecutor::new();
    debug!("{}: sensor thread started", job.thread.trim_end_matches('\0'));
    futures_lite::future::block_on(executor.run(job.future));
}

//! Mock hardware adapters for integration tests.
//!
//! Records every pin and PWM write so tests can assert on what reached
//! the "hardware" without touching real GPIO/LEDC registers.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use roomhub::actuators::curtain::{Curtain, CurtainPosition};
use roomhub::actuators::fan::Fan;
use roomhub::actuators::lamp::Lamp;
use roomhub::app::events::DeviceEvent;
use roomhub::app::ports::EventSink;
use roomhub::config::{CurtainConfig, FanConfig};
use roomhub::drivers::stepper::HalfStepper;

// ── Digital output ────────────────────────────────────────────

/// Output pin whose level is observable through a shared flag.
#[derive(Clone, Default)]
pub struct MockPin {
    high: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.high.load(Ordering::Acquire)
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high.store(false, Ordering::Release);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high.store(true, Ordering::Release);
        Ok(())
    }
}

// ── PWM ───────────────────────────────────────────────────────

/// 8-bit PWM channel recording the last duty written.
#[derive(Clone, Default)]
pub struct MockPwm {
    duty: Arc<AtomicU16>,
}

#[allow(dead_code)]
impl MockPwm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duty(&self) -> u16 {
        self.duty.load(Ordering::Acquire)
    }
}

impl embedded_hal::pwm::ErrorType for MockPwm {
    type Error = Infallible;
}

impl SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.duty.store(duty, Ordering::Release);
        Ok(())
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Sleeps a fixed real-time slice per millisecond requested, so a stroke
/// takes long enough to be observed without slowing the suite down.
#[derive(Clone, Copy)]
pub struct ScaledDelay {
    pub per_ms: Duration,
}

impl DelayNs for ScaledDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(self.per_ms * ms);
    }
}

// ── Event recorder ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DeviceEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, f: impl Fn(&DeviceEvent) -> bool) -> usize {
        self.events().iter().filter(|e| f(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &DeviceEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*event);
    }
}

// ── Rigs ──────────────────────────────────────────────────────

/// Short stroke: 200 half-steps at 1 ms each, stop checked every 10.
pub fn fast_curtain_config(initial: CurtainPosition) -> CurtainConfig {
    CurtainConfig {
        steps_per_stroke: 200,
        step_delay_ms: 1,
        abort_check_interval: 10,
        queue_wait_ms: 10,
        initial_position: initial,
    }
}

#[allow(dead_code)]
pub fn spawn_curtain(initial: CurtainPosition, sink: Arc<dyn EventSink>) -> (Curtain, [MockPin; 4]) {
    let pins = [MockPin::new(), MockPin::new(), MockPin::new(), MockPin::new()];
    let stepper = HalfStepper::new(pins.clone()).expect("stepper");
    let (curtain, _task) = Curtain::spawn(
        stepper,
        ScaledDelay {
            per_ms: Duration::from_millis(1),
        },
        fast_curtain_config(initial),
        sink,
    )
    .expect("curtain spawn");
    (curtain, pins)
}

#[allow(dead_code)]
pub fn fan(sink: Arc<dyn EventSink>) -> (Arc<Fan>, MockPwm) {
    let pwm = MockPwm::new();
    let fan = Fan::new(pwm.clone(), FanConfig::default(), sink).expect("fan");
    (Arc::new(fan), pwm)
}

#[allow(dead_code)]
pub fn lamp(sink: Arc<dyn EventSink>) -> (Arc<Lamp>, MockPin) {
    let pin = MockPin::new();
    let lamp = Lamp::new(pin.clone(), sink).expect("lamp");
    (Arc::new(lamp), pin)
}

/// Poll `cond` until it holds or `timeout` passes.
#[allow(dead_code)]
pub fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

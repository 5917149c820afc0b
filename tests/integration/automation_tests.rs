//! Sensor polling into the smoke response, with real actuators on mock
//! outputs.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use roomhub::actuators::curtain::CurtainPosition;
use roomhub::actuators::Outcome;
use roomhub::app::events::DeviceEvent;
use roomhub::app::ports::{AnalogInput, EventSink, FanOut};
use roomhub::automation::SmokeResponse;
use roomhub::config::Mq2Config;
use roomhub::error::SensorError;
use roomhub::sensors::SensorCache;
use roomhub::sensors::dht11::ClimateReading;
use roomhub::sensors::mq2::{Mq2, SmokeReading};
use roomhub::sensors::polling::{Acquisition, Poller};

use crate::mock_hw::{RecordingSink, ScaledDelay, fan, lamp, spawn_curtain, wait_until};

/// Roughly 3200 ppm with the default curve.
const SMOKY_MV: u32 = 2000;
/// Roughly 12 ppm.
const CLEAN_MV: u32 = 200;

/// ADC whose calibrated voltage the test sets directly.
#[derive(Clone, Default)]
struct KnobAdc {
    millivolts: Arc<AtomicU32>,
    failing: Arc<AtomicBool>,
}

impl KnobAdc {
    fn set(&self, mv: u32) {
        self.millivolts.store(mv, Ordering::SeqCst);
    }
}

impl AnalogInput for KnobAdc {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SensorError::AdcReadFailed);
        }
        Ok((self.millivolts.load(Ordering::SeqCst) * 4095 / 3300) as u16)
    }

    fn calibrated_millivolts(&mut self, _raw: u16) -> Option<u32> {
        Some(self.millivolts.load(Ordering::SeqCst))
    }
}

fn no_delay() -> ScaledDelay {
    ScaledDelay {
        per_ms: Duration::ZERO,
    }
}

struct SmokeRig {
    adc: KnobAdc,
    poller: Poller<Mq2<KnobAdc, ScaledDelay>>,
    cache: Arc<SensorCache<SmokeReading>>,
    fan: Arc<roomhub::actuators::fan::Fan>,
    lamp: Arc<roomhub::actuators::lamp::Lamp>,
    events: Arc<RecordingSink>,
}

fn smoke_rig() -> SmokeRig {
    let events = RecordingSink::new();
    let (fan, _pwm) = fan(events.clone());
    let (lamp, _pin) = lamp(events.clone());
    let sink: Arc<dyn EventSink> = Arc::new(
        FanOut::new()
            .with(events.clone())
            .with(Arc::new(SmokeResponse::new(fan.clone(), lamp.clone()))),
    );
    let adc = KnobAdc::default();
    adc.set(CLEAN_MV);
    let cache = Arc::new(SensorCache::new());
    let poller = Poller::new(
        Mq2::new(adc.clone(), no_delay(), Mq2Config::default()),
        cache.clone(),
        sink,
        Duration::ZERO,
        Duration::from_millis(10),
    );
    SmokeRig {
        adc,
        poller,
        cache,
        fan,
        lamp,
        events,
    }
}

#[test]
fn rising_alert_drives_fan_to_max_and_lamp_on() {
    let mut rig = smoke_rig();

    let clean = rig.poller.poll_once().unwrap();
    assert!(!clean.alert);
    assert_eq!(rig.fan.snapshot().level, 0);
    assert!(!rig.lamp.snapshot().on);

    rig.adc.set(SMOKY_MV);
    let smoky = rig.poller.poll_once().unwrap();
    assert!(smoky.alert);
    assert_eq!(rig.fan.snapshot().level, 3);
    assert!(rig.lamp.snapshot().on);
    assert_eq!(rig.cache.value(), Some(smoky));
}

#[test]
fn sustained_alert_fires_once_and_rearms_after_clearing() {
    let mut rig = smoke_rig();
    rig.adc.set(SMOKY_MV);
    rig.poller.poll_once().unwrap();
    assert_eq!(rig.fan.snapshot().level, 3);

    // Manual override during a sustained alert sticks.
    rig.fan.turn_off().unwrap();
    rig.lamp.turn_off().unwrap();
    rig.poller.poll_once().unwrap();
    assert_eq!(rig.fan.snapshot().level, 0);
    assert!(!rig.lamp.snapshot().on);

    rig.adc.set(CLEAN_MV);
    rig.poller.poll_once().unwrap();
    rig.adc.set(SMOKY_MV);
    rig.poller.poll_once().unwrap();
    assert_eq!(rig.fan.snapshot().level, 3);
    assert!(rig.lamp.snapshot().on);

    let fan_to_max = rig
        .events
        .count(|e| matches!(e, DeviceEvent::Fan(f) if f.level == 3));
    assert_eq!(fan_to_max, 2);
}

#[test]
fn failed_read_keeps_the_previous_reading() {
    let mut rig = smoke_rig();
    let first = rig.poller.poll_once().unwrap();
    let emitted = rig.events.events().len();

    rig.adc.failing.store(true, Ordering::SeqCst);
    assert_eq!(rig.poller.poll_once(), Err(SensorError::AdcReadFailed));
    assert_eq!(rig.cache.value(), Some(first));
    assert_eq!(rig.events.events().len(), emitted, "failure must not emit");
}

#[test]
fn override_runs_while_the_curtain_is_moving() {
    let events = RecordingSink::new();
    let (curtain, _pins) = spawn_curtain(CurtainPosition::Open, events.clone());
    let (fan, _pwm) = fan(events.clone());
    let (lamp, pin) = lamp(events.clone());
    let response = SmokeResponse::new(fan.clone(), lamp.clone());

    assert_eq!(curtain.close(), Ok(Outcome::Started));
    assert!(wait_until(Duration::from_secs(5), || curtain.snapshot().is_running()));

    assert!(response.on_alert_sample(true, 450.0));
    assert_eq!(fan.snapshot().level, 3);
    assert!(pin.is_high());
    assert!(curtain.snapshot().is_running(), "curtain must be left alone");

    assert!(wait_until(Duration::from_secs(5), || {
        curtain.snapshot().position == CurtainPosition::Closed
    }));
    curtain.shutdown();
}

// ── Climate checksum failures ────────────────────────────────

/// Replays a fixed list of DHT11 outcomes.
struct ScriptedClimate {
    script: Vec<Result<ClimateReading, SensorError>>,
}

impl Acquisition for ScriptedClimate {
    type Output = ClimateReading;

    fn name(&self) -> &'static str {
        "scripted DHT11"
    }

    fn thread_name(&self) -> &'static str {
        "scripted\0"
    }

    fn acquire(&mut self) -> Result<ClimateReading, SensorError> {
        if self.script.is_empty() {
            return Err(SensorError::LineFault);
        }
        self.script.remove(0)
    }

    fn event(reading: ClimateReading) -> DeviceEvent {
        DeviceEvent::Climate(reading)
    }
}

#[test]
fn checksum_failure_leaves_climate_cache_unchanged() {
    let good = ClimateReading {
        temperature: 23.0,
        humidity: 45.0,
    };
    let events = RecordingSink::new();
    let cache = Arc::new(SensorCache::new());
    let mut poller = Poller::new(
        ScriptedClimate {
            script: vec![
                Ok(good),
                Err(SensorError::Checksum {
                    expected: 68,
                    received: 67,
                }),
            ],
        },
        cache.clone(),
        events.clone(),
        Duration::ZERO,
        Duration::from_millis(10),
    );

    assert!(cache.value().is_none());
    poller.poll_once().unwrap();
    assert!(matches!(
        poller.poll_once(),
        Err(SensorError::Checksum { .. })
    ));
    assert_eq!(cache.value(), Some(good));
    assert_eq!(events.count(|e| matches!(e, DeviceEvent::Climate(_))), 1);
}

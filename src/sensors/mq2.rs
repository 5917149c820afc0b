//! MQ-2 smoke / combustible-gas sensor on an ADC channel.
//!
//! The sensor element forms a divider with the load resistor:
//!
//! ```text
//!   Vsupply ── Rs ──┬── Rload ── GND
//!                   └── ADC (V)
//!
//!   Rs    = Rload · (Vsupply − V) / V
//!   ratio = R0 / Rs
//!   ppm   = baseline · ratio^exponent      (clamped to max_ppm)
//! ```
//!
//! `R0` is the sensor resistance in clean air and must be calibrated per
//! site. The curve is a coarse fit; treat ppm as an index, not a
//! measurement.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};
use serde_json::{Value, json};

use crate::app::ports::AnalogInput;
use crate::config::Mq2Config;
use crate::error::SensorError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmokeReading {
    /// Averaged raw ADC code.
    pub raw: u16,
    /// Volts at the ADC pin.
    pub voltage: f32,
    pub ppm: f32,
    /// `ppm` above the alert threshold.
    pub alert: bool,
}

impl SmokeReading {
    pub fn to_json(&self) -> Value {
        json!({
            "raw": self.raw,
            "voltage": round2(self.voltage),
            "ppm": round2(self.ppm),
            "alert": self.alert,
        })
    }

    /// Integer ppm for the display panel.
    pub fn ppm_display(&self) -> u32 {
        self.ppm.round() as u32
    }
}

fn round2(v: f32) -> f64 {
    (f64::from(v) * 100.0).round() / 100.0
}

/// Linear raw → millivolt transform used when the ADC has no calibration.
pub fn linear_millivolts(raw: u16, config: &Mq2Config) -> u32 {
    let max = f32::from(config.adc_max_raw.max(1));
    (f32::from(raw) / max * config.adc_full_scale_mv as f32) as u32
}

/// Resistance → concentration.
pub fn compute(raw: u16, millivolts: u32, c: &Mq2Config) -> SmokeReading {
    let voltage = millivolts as f32 / 1000.0;
    let (ppm, alert) = derive_ppm(voltage, c);
    SmokeReading {
        raw,
        voltage,
        ppm,
        alert,
    }
}

fn derive_ppm(voltage: f32, c: &Mq2Config) -> (f32, bool) {
    if voltage <= c.min_voltage {
        return (0.0, false);
    }

    let effective = if voltage >= c.saturation_voltage {
        warn!("MQ-2: ADC near saturation ({:.2} V)", voltage);
        c.saturation_voltage
    } else {
        voltage
    };

    let rs = c.load_resistance_kohm * (c.supply_voltage - effective) / effective;
    if rs <= 0.0 {
        return (0.0, false);
    }

    let ratio = c.r0_kohm / rs;
    let ppm = (c.baseline_ppm * ratio.powf(c.ppm_exponent)).min(c.max_ppm);
    debug!("MQ-2: Rs={:.2} kΩ ratio={:.2}", rs, ratio);
    (ppm, ppm > c.alert_threshold_ppm)
}

pub struct Mq2<A, D> {
    adc: A,
    delay: D,
    config: Mq2Config,
}

impl<A, D> Mq2<A, D>
where
    A: AnalogInput,
    D: DelayNs,
{
    pub fn new(adc: A, delay: D, config: Mq2Config) -> Self {
        Self { adc, delay, config }
    }

    /// Average `samples` conversions and derive the concentration.
    pub fn read(&mut self) -> Result<SmokeReading, SensorError> {
        let samples = self.config.samples.max(1);
        let mut sum: u32 = 0;
        for _ in 0..samples {
            sum += u32::from(self.adc.read_raw()?);
            self.delay.delay_ms(self.config.sample_delay_ms);
        }
        let raw = (sum / u32::from(samples)) as u16;

        let millivolts = self
            .adc
            .calibrated_millivolts(raw)
            .unwrap_or_else(|| linear_millivolts(raw, &self.config));
        Ok(compute(raw, millivolts, &self.config))
    }
}

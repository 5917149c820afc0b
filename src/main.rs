//! RoomHub firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       Adapters (outer ring)                      │
//! │                                                                  │
//! │  OpenDrainLine  Mq2Adc   UartTransport  EspMqttTransport  Wifi   │
//! │  LogEventSink   BrokerStateSink   PanelSink                      │
//! │                                                                  │
//! │  ──────────────── Port Trait Boundary ──────────────────────     │
//! │                                                                  │
//! │   Curtain task (App core)     Sensor executor (App core)         │
//! │   Serial dispatcher (App)     MQTT events (Pro core)             │
//! │                                                                  │
//! │   AppService: broker routing · discovery · tools · panel frames  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use esp_idf_hal::adc::attenuation::DB_11;
use esp_idf_hal::adc::oneshot::config::{AdcChannelConfig, Calibration};
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::gpio::{AnyIOPin, IOPin, OutputPin as _, PinDriver};
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartDriverConfig};
use esp_idf_hal::units::{FromValueType, Hertz};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{info, warn};

use roomhub::actuators::curtain::Curtain;
use roomhub::actuators::fan::Fan;
use roomhub::actuators::lamp::Lamp;
use roomhub::adapters::broker_sink::BrokerStateSink;
use roomhub::adapters::esp_io::{Mq2Adc, OpenDrainLine, UartTransport};
use roomhub::adapters::esp_mqtt::EspMqttTransport;
use roomhub::adapters::log_sink::LogEventSink;
use roomhub::adapters::panel_sink::PanelSink;
use roomhub::adapters::wifi::{ConnectivityPort, WifiAdapter};
use roomhub::app::commands::CommandRouter;
use roomhub::app::ports::{EventSink, FanOut};
use roomhub::app::service::{AppService, Devices, Readings};
use roomhub::automation::SmokeResponse;
use roomhub::config::SystemConfig;
use roomhub::drivers::delay::{BusyDelay, TaskDelay};
use roomhub::drivers::stepper::HalfStepper;
use roomhub::integration::mqtt::MqttClient;
use roomhub::pins;
use roomhub::sensors::dht11::Dht11;
use roomhub::sensors::mq2::Mq2;
use roomhub::sensors::polling::{Poller, SensorTasks};
use roomhub::serial::dispatcher::Dispatcher;
use roomhub::serial::link::SerialLink;

const NETWORK_POLL: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  RoomHub v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    info!(
        "Pins: lamp={} fan={} curtain={}-{} dht11={} mq2={} panel tx/rx={}/{}",
        pins::LAMP_GPIO,
        pins::FAN_PWM_GPIO,
        pins::CURTAIN_IN1_GPIO,
        pins::CURTAIN_IN4_GPIO,
        pins::DHT11_GPIO,
        pins::MQ2_ADC_GPIO,
        pins::PANEL_UART_TX_GPIO,
        pins::PANEL_UART_RX_GPIO,
    );

    let config = SystemConfig::default();
    let peripherals = Peripherals::take()?;
    let gpio = peripherals.pins;

    // ── 2. Panel UART ─────────────────────────────────────────
    let uart = UartDriver::new(
        peripherals.uart1,
        gpio.gpio17,
        gpio.gpio18,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartDriverConfig::default().baudrate(Hertz(config.uart.baud_rate)),
    )
    .context("UART1 init")?;
    let link = Arc::new(SerialLink::new(Arc::new(UartTransport::new(uart)), config.uart));

    // ── 3. Broker client (started once Wi-Fi is up) ───────────
    let transport = EspMqttTransport::new(
        &config.broker_uri,
        &config.device.id,
        &config.broker_username,
        &config.broker_password,
    );
    let mqtt = MqttClient::new(
        Arc::new(transport),
        config.broker_uri.clone(),
        config.default_topic.clone(),
    );

    // ── 4. Event sinks ────────────────────────────────────────
    let device_sink: Arc<dyn EventSink> = Arc::new(
        FanOut::new()
            .with(Arc::new(LogEventSink::new()))
            .with(Arc::new(BrokerStateSink::new(
                Arc::clone(&mqtt),
                config.topics.clone(),
            )))
            .with(Arc::new(PanelSink::new(Arc::clone(&link)))),
    );

    // ── 5. Actuators ──────────────────────────────────────────
    let lamp = Arc::new(Lamp::new(
        PinDriver::output(gpio.gpio1).context("lamp pin")?,
        Arc::clone(&device_sink),
    )?);

    let fan_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default()
            .frequency(config.fan.pwm_frequency_hz.Hz())
            .resolution(Resolution::Bits8),
    )
    .context("fan LEDC timer")?;
    let fan_pwm = LedcDriver::new(peripherals.ledc.channel0, fan_timer, gpio.gpio8)
        .context("fan LEDC channel")?;
    let fan = Arc::new(Fan::new(fan_pwm, config.fan, Arc::clone(&device_sink))?);

    let coils = [
        PinDriver::output(gpio.gpio9.downgrade_output())?,
        PinDriver::output(gpio.gpio10.downgrade_output())?,
        PinDriver::output(gpio.gpio11.downgrade_output())?,
        PinDriver::output(gpio.gpio12.downgrade_output())?,
    ];
    let (curtain, _curtain_task) = Curtain::spawn(
        HalfStepper::new(coils)?,
        TaskDelay,
        config.curtain,
        Arc::clone(&device_sink),
    )?;

    // ── 6. Sensors ────────────────────────────────────────────
    let sensor_sink: Arc<dyn EventSink> = Arc::new(
        FanOut::new()
            .with(Arc::clone(&device_sink))
            .with(Arc::new(SmokeResponse::new(Arc::clone(&fan), Arc::clone(&lamp)))),
    );
    let readings = Readings::default();

    let dht11 = Dht11::new(
        OpenDrainLine::new(gpio.gpio3.downgrade()).context("DHT11 pin")?,
        BusyDelay,
        config.dht11,
    );
    let adc = AdcDriver::new(peripherals.adc2).context("ADC2")?;
    let adc_channel = AdcChannelDriver::new(
        adc,
        gpio.gpio14,
        &AdcChannelConfig {
            attenuation: DB_11,
            calibration: Calibration::Curve,
            ..Default::default()
        },
    )
    .context("MQ-2 ADC channel")?;
    let mq2 = Mq2::new(Mq2Adc::new(adc_channel), TaskDelay, config.mq2);

    let _sensor_threads = SensorTasks::new()
        .with(Poller::new(
            dht11,
            Arc::clone(&readings.climate),
            Arc::clone(&sensor_sink),
            Duration::from_millis(u64::from(config.dht11.stabilize_ms)),
            Duration::from_millis(u64::from(config.dht11.interval_ms)),
        ))
        .with(Poller::new(
            mq2,
            Arc::clone(&readings.smoke),
            Arc::clone(&sensor_sink),
            Duration::from_millis(u64::from(config.mq2.preheat_ms)),
            Duration::from_millis(u64::from(config.mq2.interval_ms)),
        ))
        .spawn()
        .context("sensor tasks")?;

    // ── 7. Application service ────────────────────────────────
    let service = AppService::new(
        config.clone(),
        Devices {
            curtain,
            fan,
            lamp,
        },
        readings,
        Arc::clone(&mqtt),
    );
    service.attach_broker();
    let tools = service.tools();
    for (name, _) in tools.list() {
        info!("Control surface: {}", name);
    }

    let router: Arc<dyn CommandRouter> = service.clone();
    let _serial_thread = Dispatcher::new(Arc::clone(&link), router)
        .spawn()
        .context("serial task")?;

    // ── 8. Network ────────────────────────────────────────────
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?);

    let mut broker_started = false;
    match wifi.set_credentials(&config.wifi_ssid, &config.wifi_password) {
        Ok(()) => match wifi.connect() {
            Ok(()) => broker_started = start_broker(&mqtt),
            Err(e) => warn!("WiFi: initial connect failed ({}), retrying in background", e),
        },
        Err(e) => warn!("WiFi: {}, broker integration disabled", e),
    }

    info!("System ready.");

    loop {
        std::thread::sleep(NETWORK_POLL);
        let came_up = wifi.poll();
        if !broker_started && (came_up || wifi.is_connected()) {
            broker_started = start_broker(&mqtt);
        }
    }
}

fn start_broker(mqtt: &MqttClient) -> bool {
    match mqtt.on_network_ready() {
        Ok(()) => true,
        Err(e) => {
            warn!("MQTT: start failed: {}", e);
            false
        }
    }
}

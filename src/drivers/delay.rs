//! Task-level delays.
//!
//! Actuator and sensor tasks sleep through `embedded_hal::delay::DelayNs`
//! so they can be driven by a virtual clock in tests.
//!
//! On ESP-IDF, millisecond sleeps yield to FreeRTOS (`FreeRtos`) and
//! microsecond waits busy-spin in ROM (`Ets`). On host, both map to
//! `std::thread::sleep`.

#[cfg(target_os = "espidf")]
pub use esp_idf_hal::delay::{Ets as BusyDelay, FreeRtos as TaskDelay};

#[cfg(not(target_os = "espidf"))]
pub use self::sim::{StdDelay as BusyDelay, StdDelay as TaskDelay};

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::time::Duration;
    use embedded_hal::delay::DelayNs;

    /// Thread-sleep delay for host builds.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct StdDelay;

    impl DelayNs for StdDelay {
        fn delay_ns(&mut self, ns: u32) {
            std::thread::sleep(Duration::from_nanos(u64::from(ns)));
        }

        fn delay_ms(&mut self, ms: u32) {
            std::thread::sleep(Duration::from_millis(u64::from(ms)));
        }
    }
}

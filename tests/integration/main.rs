//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host (x86_64) with no
//! real hardware required.

#![cfg(not(target_os = "espidf"))]

mod automation_tests;
mod curtain_tests;
mod mock_hw;
mod mqtt_tests;
mod serial_tests;
mod service_tests;

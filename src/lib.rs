//! RoomHub controller firmware library.
//!
//! Exposes every module for integration testing. All ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each module;
//! on other targets the simulation adapters stand in.

#![deny(unused_must_use)]

pub mod actuators;
pub mod adapters;
pub mod app;
pub mod automation;
pub mod config;
pub mod drivers;
pub mod error;
pub mod integration;
pub mod pins;
pub mod protocol;
pub mod sensors;
pub mod serial;

//! Core building blocks for the homeframe photo frame controller.
//!
//! Every interaction with the OS goes through [`command::CommandRunner`],
//! so the presence scanner, display and monitor wrappers, and system
//! actions can all be driven by [`command::ScriptedRunner`] in tests.
//!
//! Key modules:
//! - [`config`]: TOML configuration with per-field defaults
//! - [`presence`]: Wi-Fi scan and Bluetooth echo probes
//! - [`monitor`]: `MonitorControl` capability and its ddcutil backend
//! - [`display`]: display power and slideshow process control
//! - [`flags`] / [`mode`]: marker files and the Auto/Manual mode channel
//! - [`schedule`]: active-hours window and the daily reset

pub mod command;
pub mod config;
pub mod devices;
pub mod display;
pub mod flags;
pub mod mode;
pub mod monitor;
pub mod presence;
pub mod schedule;
pub mod status;
pub mod system;

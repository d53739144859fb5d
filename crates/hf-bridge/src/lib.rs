//! Web dashboard for the photo frame.
//!
//! A small axum application that lets a phone on the LAN force the screen
//! on or off, hand control back to the presence poller, set the monitor
//! brightness, watch live CPU/memory/temperature over server-sent events,
//! and reboot the Pi.

pub mod api_error;
pub mod http_api;

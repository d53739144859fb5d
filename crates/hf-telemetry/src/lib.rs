//! Logging and request tracing shared by the homeframe binaries.
//!
//! - **Logging**: human-readable or JSON output via `tracing-subscriber`,
//!   filtered by `RUST_LOG` or a configured default level
//! - **Middleware**: an axum layer that tags each request with an
//!   `x-request-id` and logs its status and latency

pub mod logging;
pub mod middleware;

//! Monitor control over DDC/CI.
//!
//! [`MonitorControl`] is the capability the rest of the code depends on.
//! [`DdcMonitor`] implements it by running `ddcutil` and scraping its text
//! output, so a different backend only has to implement the trait.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::command::{CommandError, CommandRunner, CommandSpec};
use crate::config::MonitorConfig;

static CURRENT_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"current value\s*=\s*(\d+)").expect("Invalid current value regex")
});

static SL_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sl=0x([0-9a-fA-F]+)").expect("Invalid sl= regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("could not parse monitor output: {0}")]
    Unparseable(String),

    #[error("brightness {0} is outside 0..=100")]
    OutOfRange(u32),
}

/// What the dashboard and poller need from the monitor.
///
/// Contract:
/// - `get_brightness` returns the current backlight level in `0..=100`.
/// - `set_brightness` accepts `0..=100` and rejects anything else with
///   [`MonitorError::OutOfRange`] without touching the monitor.
/// - `get_active_input` returns the raw input-source value the monitor
///   reports (MCCS feature 0x60), to be compared with the configured one.
#[async_trait]
pub trait MonitorControl: Send + Sync {
    async fn get_brightness(&self) -> Result<u8, MonitorError>;
    async fn set_brightness(&self, level: u32) -> Result<(), MonitorError>;
    async fn get_active_input(&self) -> Result<u16, MonitorError>;
}

/// Is this device the monitor's selected input?
///
/// Any query failure answers `true`: the screen is left on rather than
/// risk turning it off while someone is using it.
pub async fn is_active_source(monitor: &dyn MonitorControl, expected_input: u16) -> bool {
    match monitor.get_active_input().await {
        Ok(input) => {
            debug!(input, expected_input, "monitor input source");
            input == expected_input
        }
        Err(e) => {
            warn!(error = %e, "input source query failed, assuming this device is active");
            true
        }
    }
}

/// Extract the decimal `current value = N` from `ddcutil getvcp` output.
pub fn parse_current_value(output: &str) -> Option<u32> {
    CURRENT_VALUE
        .captures(output)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract an input source value, accepting both the decimal
/// `current value = N` form and the `(sl=0xNN)` form ddcutil prints for
/// non-continuous features.
pub fn parse_input_source(output: &str) -> Option<u16> {
    if let Some(v) = parse_current_value(output) {
        return u16::try_from(v).ok();
    }
    SL_VALUE
        .captures(output)
        .and_then(|c| c.get(1))
        .and_then(|m| u16::from_str_radix(m.as_str(), 16).ok())
}

/// `ddcutil`-backed monitor control.
#[derive(Clone)]
pub struct DdcMonitor {
    runner: Arc<dyn CommandRunner>,
    config: MonitorConfig,
}

impl DdcMonitor {
    pub fn new(runner: Arc<dyn CommandRunner>, config: MonitorConfig) -> Self {
        Self { runner, config }
    }

    fn ddcutil(&self) -> CommandSpec {
        let spec = CommandSpec::new("ddcutil");
        match self.config.bus {
            Some(bus) => spec.arg(format!("--bus={bus}")),
            None => spec,
        }
    }

    async fn getvcp(&self, feature: &str) -> Result<String, MonitorError> {
        let spec = self.ddcutil().args(["getvcp", feature]);
        let out = self.runner.run(&spec).await?.check("ddcutil")?;
        Ok(out.stdout)
    }
}

#[async_trait]
impl MonitorControl for DdcMonitor {
    async fn get_brightness(&self) -> Result<u8, MonitorError> {
        let stdout = self.getvcp(&self.config.brightness_feature).await?;
        let value = parse_current_value(&stdout)
            .ok_or_else(|| MonitorError::Unparseable(stdout.trim().to_string()))?;
        Ok(value.min(100) as u8)
    }

    async fn set_brightness(&self, level: u32) -> Result<(), MonitorError> {
        if level > 100 {
            return Err(MonitorError::OutOfRange(level));
        }
        let spec = self
            .ddcutil()
            .args(["setvcp", self.config.brightness_feature.as_str()])
            .arg(level.to_string());
        self.runner.run(&spec).await?.check("ddcutil")?;
        debug!(level, "brightness set");
        Ok(())
    }

    async fn get_active_input(&self) -> Result<u16, MonitorError> {
        let stdout = self.getvcp(&self.config.input_feature).await?;
        parse_input_source(&stdout).ok_or_else(|| MonitorError::Unparseable(stdout.trim().to_string()))
    }
}

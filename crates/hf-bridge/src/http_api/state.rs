use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::RwLock;

use hf_core::config::Config;
use hf_core::devices::Devices;
use hf_core::mode::ModeHandle;
use hf_core::status::{PollerStatus, SharedStatus};

/// Shared state handed to every handler.
pub struct ApiState {
    pub devices: Devices,
    pub mode: ModeHandle,
    pub status: SharedStatus,
    /// Shown on the dashboard when the monitor cannot be queried.
    pub default_brightness: u8,
    /// Time the slideshow gets to load before `/screen/on` powers the display.
    pub warmup: Duration,
    pub stats_interval: Duration,
    pub thermal_path: PathBuf,
}

impl ApiState {
    pub fn new(config: &Config, devices: Devices, mode: ModeHandle, status: SharedStatus) -> Self {
        Self {
            devices,
            mode,
            status,
            default_brightness: config.monitor.default_brightness,
            warmup: config.slideshow.warmup(),
            stats_interval: Duration::from_secs(config.dashboard.stats_interval_secs),
            thermal_path: config.dashboard.thermal_path.clone(),
        }
    }

    /// State with its own, empty poller status.
    pub fn standalone(config: &Config, devices: Devices, mode: ModeHandle) -> Arc<Self> {
        let status = Arc::new(RwLock::new(PollerStatus::default()));
        Arc::new(Self::new(config, devices, mode, status))
    }
}

/// Local calendar date, written into the override flag.
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

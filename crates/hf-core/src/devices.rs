use std::sync::Arc;

use crate::command::CommandRunner;
use crate::config::Config;
use crate::display::{DisplayPower, Slideshow};
use crate::monitor::{DdcMonitor, MonitorControl};
use crate::presence::PresenceScanner;
use crate::system::SystemActions;

/// Everything that touches hardware or processes, built over one runner.
///
/// Cloning is cheap; the poller and the dashboard each hold a copy.
#[derive(Clone)]
pub struct Devices {
    pub presence: PresenceScanner,
    pub display: DisplayPower,
    pub slideshow: Slideshow,
    pub monitor: Arc<dyn MonitorControl>,
    pub system: SystemActions,
}

impl Devices {
    pub fn from_config(config: &Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            presence: PresenceScanner::new(
                runner.clone(),
                config.presence.clone(),
                config.system.use_sudo,
            ),
            display: DisplayPower::new(runner.clone(), config.display.clone()),
            slideshow: Slideshow::new(runner.clone(), config.slideshow.clone(), &config.display),
            monitor: Arc::new(DdcMonitor::new(runner.clone(), config.monitor.clone())),
            system: SystemActions::new(runner, config.system.clone()),
        }
    }

    /// Replace the monitor backend.
    pub fn with_monitor(mut self, monitor: Arc<dyn MonitorControl>) -> Self {
        self.monitor = monitor;
        self
    }
}

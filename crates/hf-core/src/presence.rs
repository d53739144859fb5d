//! Phone presence detection.
//!
//! Two independent signals, either of which is enough:
//! - a ping sweep of the LAN (`nmap -sn`) whose report lists the phone's
//!   Wi-Fi MAC address;
//! - a single L2CAP echo (`l2ping -c 1`) to the phone's Bluetooth address.
//!
//! A failed, timed-out or non-matching probe counts as "not detected".

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::command::{CommandRunner, CommandSpec};
use crate::config::PresenceConfig;

/// What `l2ping -c 1` prints when the single echo came back.
pub const ECHO_SUCCESS: &str = "1 sent, 1 received";

/// Outcome of one presence check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceReport {
    pub wifi: bool,
    pub bluetooth: bool,
}

impl PresenceReport {
    pub fn is_present(&self) -> bool {
        self.wifi || self.bluetooth
    }
}

/// True if an `nmap` report mentions `mac`, ignoring case.
pub fn scan_lists_mac(stdout: &str, mac: &str) -> bool {
    !mac.is_empty() && stdout.to_lowercase().contains(&mac.to_lowercase())
}

/// True if `l2ping` output reports the echo as received.
pub fn echo_received(stdout: &str) -> bool {
    stdout.to_lowercase().contains(ECHO_SUCCESS)
}

/// Runs the Wi-Fi and Bluetooth probes.
#[derive(Clone)]
pub struct PresenceScanner {
    runner: Arc<dyn CommandRunner>,
    config: PresenceConfig,
    privileged: bool,
}

impl PresenceScanner {
    pub fn new(runner: Arc<dyn CommandRunner>, config: PresenceConfig, privileged: bool) -> Self {
        Self {
            runner,
            config,
            privileged,
        }
    }

    /// Probe for the phone. Bluetooth is only tried when Wi-Fi found nothing.
    pub async fn check(&self) -> PresenceReport {
        debug!("scanning for phone");
        let mut report = PresenceReport {
            wifi: self.wifi_probe().await,
            bluetooth: false,
        };
        if report.wifi {
            info!("phone detected on Wi-Fi");
            return report;
        }

        report.bluetooth = self.bluetooth_probe().await;
        if report.bluetooth {
            info!("phone detected via Bluetooth");
        } else {
            info!("phone not found");
        }
        report
    }

    async fn wifi_probe(&self) -> bool {
        if self.config.wifi_mac.is_empty() {
            return false;
        }
        let spec = CommandSpec::new("nmap")
            .args(["-sn", self.config.subnet.as_str()])
            .privileged(self.privileged)
            .timeout(Duration::from_secs(self.config.wifi_timeout_secs));
        match self.runner.run(&spec).await {
            Ok(out) => scan_lists_mac(&out.stdout, &self.config.wifi_mac),
            Err(e) => {
                warn!(error = %e, "network scan failed");
                false
            }
        }
    }

    async fn bluetooth_probe(&self) -> bool {
        if self.config.bluetooth_mac.is_empty() {
            return false;
        }
        let spec = CommandSpec::new("l2ping")
            .args(["-c", "1", self.config.bluetooth_mac.as_str()])
            .privileged(self.privileged)
            .timeout(Duration::from_secs(self.config.bluetooth_timeout_secs));
        match self.runner.run(&spec).await {
            Ok(out) => echo_received(&out.stdout),
            Err(e) => {
                warn!(error = %e, "bluetooth echo failed");
                false
            }
        }
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::presence::PresenceReport;

/// What the poller decided on its last cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// The override flag was set; nothing else ran.
    ManualOverride,
    /// Outside active hours; slideshow stopped.
    Sleeping,
    /// Phone present; slideshow running and display on.
    Home,
    /// Phone came back during the confirmation wait.
    Redetected,
    /// Phone confirmed away; today's maintenance already done.
    Away,
    /// Phone confirmed away; update ran and a reboot was issued.
    Rebooting,
    /// Phone confirmed away; the update failed so no reboot.
    UpdateFailed,
    /// The mode changed during the confirmation wait.
    Interrupted,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::ManualOverride => "manual_override",
            CycleOutcome::Sleeping => "sleeping",
            CycleOutcome::Home => "home",
            CycleOutcome::Redetected => "redetected",
            CycleOutcome::Away => "away",
            CycleOutcome::Rebooting => "rebooting",
            CycleOutcome::UpdateFailed => "update_failed",
            CycleOutcome::Interrupted => "interrupted",
        }
    }
}

/// Last poller result, readable from the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollerStatus {
    pub last_outcome: Option<CycleOutcome>,
    pub last_presence: Option<PresenceReport>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PollerStatus {
    pub fn record(&mut self, outcome: CycleOutcome, presence: Option<PresenceReport>) {
        self.last_outcome = Some(outcome);
        if presence.is_some() {
            self.last_presence = presence;
        }
        self.updated_at = Some(Utc::now());
    }
}

pub type SharedStatus = Arc<RwLock<PollerStatus>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_last_known_presence() {
        let mut status = PollerStatus::default();
        let seen = PresenceReport {
            wifi: true,
            bluetooth: false,
        };
        status.record(CycleOutcome::Home, Some(seen));
        status.record(CycleOutcome::ManualOverride, None);

        assert_eq!(status.last_outcome, Some(CycleOutcome::ManualOverride));
        assert_eq!(status.last_presence, Some(seen));
        assert!(status.updated_at.is_some());
    }

    #[test]
    fn outcome_serializes_like_as_str() {
        for outcome in [CycleOutcome::UpdateFailed, CycleOutcome::Home, CycleOutcome::Interrupted] {
            assert_eq!(
                serde_json::to_value(outcome).unwrap(),
                serde_json::Value::String(outcome.as_str().to_string())
            );
        }
    }
}

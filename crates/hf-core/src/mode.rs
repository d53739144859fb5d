use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use crate::flags::{FlagError, FlagStore};

/// Who is in charge of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The poller drives the display from presence and schedule.
    Auto,
    /// The user forced the screen on or off from the dashboard.
    Manual,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Auto => f.write_str("Auto"),
            Mode::Manual => f.write_str("Manual"),
        }
    }
}

/// Shared handle for reading and changing the mode.
///
/// The override flag file is the source of truth so that manual mode
/// survives a restart. Every change is also published on a watch channel,
/// which lets the poller cut a wait short instead of being killed and
/// relaunched.
#[derive(Debug, Clone)]
pub struct ModeHandle {
    flags: FlagStore,
    tx: Arc<watch::Sender<Mode>>,
}

impl ModeHandle {
    pub fn new(flags: FlagStore) -> Self {
        let (tx, _rx) = watch::channel(flags.mode());
        Self {
            flags,
            tx: Arc::new(tx),
        }
    }

    pub fn flags(&self) -> &FlagStore {
        &self.flags
    }

    /// Mode as currently recorded on disk.
    pub fn current(&self) -> Mode {
        self.flags.mode()
    }

    /// Record `mode` on disk and notify subscribers.
    pub fn set(&self, mode: Mode, today: NaiveDate) -> Result<(), FlagError> {
        match mode {
            Mode::Manual => self.flags.set_manual_override(today)?,
            Mode::Auto => {
                self.flags.clear_manual_override()?;
            }
        }
        let previous = self.tx.send_replace(mode);
        info!(%previous, current = %mode, "mode set");
        Ok(())
    }

    /// Receive every subsequent mode change.
    pub fn subscribe(&self) -> watch::Receiver<Mode> {
        self.tx.subscribe()
    }
}

//! Marker files shared between the poller and the dashboard.
//!
//! Only the existence of a flag file carries meaning. The manual-override
//! file holds the date it was written, which nothing reads back.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use crate::config::FlagsConfig;
use crate::mode::Mode;

#[derive(Debug, Error)]
#[error("flag file {path}: {source}")]
pub struct FlagError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// The manual-override and reboot-done marker files.
#[derive(Debug, Clone)]
pub struct FlagStore {
    manual_override: PathBuf,
    reboot_done: PathBuf,
}

impl FlagStore {
    pub fn new(config: &FlagsConfig) -> Self {
        Self {
            manual_override: config.manual_override_path(),
            reboot_done: config.reboot_done_path(),
        }
    }

    /// Flag store rooted at `dir` with the default file names.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let config = FlagsConfig {
            dir: dir.into(),
            ..FlagsConfig::default()
        };
        Self::new(&config)
    }

    pub fn manual_override_path(&self) -> &Path {
        &self.manual_override
    }

    pub fn reboot_done_path(&self) -> &Path {
        &self.reboot_done
    }

    pub fn is_manual_override(&self) -> bool {
        self.manual_override.exists()
    }

    /// Current mode as recorded on disk.
    pub fn mode(&self) -> Mode {
        if self.is_manual_override() {
            Mode::Manual
        } else {
            Mode::Auto
        }
    }

    pub fn set_manual_override(&self, today: NaiveDate) -> Result<(), FlagError> {
        write_flag(&self.manual_override, &today.format("%Y-%m-%d").to_string())
    }

    /// Remove the override flag. Returns whether a flag was present.
    pub fn clear_manual_override(&self) -> Result<bool, FlagError> {
        remove_flag(&self.manual_override)
    }

    pub fn is_reboot_done(&self) -> bool {
        self.reboot_done.exists()
    }

    pub fn set_reboot_done(&self) -> Result<(), FlagError> {
        write_flag(&self.reboot_done, "")
    }

    /// Remove the reboot flag. Returns whether a flag was present.
    pub fn clear_reboot_done(&self) -> Result<bool, FlagError> {
        remove_flag(&self.reboot_done)
    }
}

fn write_flag(path: &Path, contents: &str) -> Result<(), FlagError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| FlagError {
            path: path.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, contents).map_err(|source| FlagError {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "flag written");
    Ok(())
}

fn remove_flag(path: &Path) -> Result<bool, FlagError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "flag removed");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(FlagError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

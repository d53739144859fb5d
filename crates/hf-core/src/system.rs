//! Package update and reboot.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::command::{CommandError, CommandRunner, CommandSpec};
use crate::config::SystemConfig;

/// Privileged maintenance actions.
#[derive(Clone)]
pub struct SystemActions {
    runner: Arc<dyn CommandRunner>,
    config: SystemConfig,
}

impl SystemActions {
    pub fn new(runner: Arc<dyn CommandRunner>, config: SystemConfig) -> Self {
        Self { runner, config }
    }

    pub fn auto_update(&self) -> bool {
        self.config.auto_update
    }

    fn privileged(&self, argv: &[String]) -> Option<CommandSpec> {
        CommandSpec::from_argv(argv).map(|spec| spec.privileged(self.config.use_sudo))
    }

    /// Run every update step in order, stopping at the first failure.
    pub async fn update(&self) -> Result<(), CommandError> {
        for step in &self.config.update_steps {
            let Some(spec) = self.privileged(step) else {
                continue;
            };
            info!(command = %spec.command_line(), "running update step");
            let out = self.runner.run(&spec).await?;
            out.check(&spec.program).inspect_err(|e| {
                error!(error = %e, "update step failed");
            })?;
        }
        info!("system update complete");
        Ok(())
    }

    /// Ask the OS to reboot. Returns once the command has been issued.
    pub async fn reboot(&self) -> Result<(), CommandError> {
        let Some(spec) = self.privileged(&self.config.reboot_command) else {
            warn!("no reboot command configured");
            return Ok(());
        };
        warn!(command = %spec.command_line(), "rebooting");
        self.runner.run(&spec).await?.check(&spec.program)?;
        Ok(())
    }
}

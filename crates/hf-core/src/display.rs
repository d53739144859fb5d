//! Display power (`wlr-randr`) and slideshow process control.
//!
//! None of these operations fail outward: a command that cannot be run is
//! logged and the caller carries on with the next step.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::command::{CommandRunner, CommandSpec};
use crate::config::{DisplayConfig, DisplaySession, SlideshowConfig};

/// Turns the HDMI output on and off in the configured Wayland session.
#[derive(Clone)]
pub struct DisplayPower {
    runner: Arc<dyn CommandRunner>,
    config: DisplayConfig,
}

impl DisplayPower {
    pub fn new(runner: Arc<dyn CommandRunner>, config: DisplayConfig) -> Self {
        Self { runner, config }
    }

    fn wlr_randr(&self) -> CommandSpec {
        CommandSpec::new("wlr-randr")
            .args(["--output", self.config.output.as_str()])
            .session(&self.config.session)
    }

    pub async fn on(&self) {
        let spec = self
            .wlr_randr()
            .args(["--on", "--mode", self.config.mode.as_str()]);
        self.power(spec, "on").await;
    }

    pub async fn off(&self) {
        let spec = self.wlr_randr().arg("--off");
        self.power(spec, "off").await;
    }

    async fn power(&self, spec: CommandSpec, state: &str) {
        let result = self
            .runner
            .run(&spec)
            .await
            .and_then(|out| out.check("wlr-randr"));
        match result {
            Ok(_) => info!(output = %self.config.output, state, "display power"),
            Err(e) => warn!(output = %self.config.output, state, error = %e, "display power change failed"),
        }
    }
}

/// Starts, stops and detects the slideshow program.
#[derive(Clone)]
pub struct Slideshow {
    runner: Arc<dyn CommandRunner>,
    config: SlideshowConfig,
    session: DisplaySession,
}

impl Slideshow {
    pub fn new(runner: Arc<dyn CommandRunner>, config: SlideshowConfig, display: &DisplayConfig) -> Self {
        Self {
            runner,
            config,
            session: display.session.clone(),
        }
    }

    pub fn config(&self) -> &SlideshowConfig {
        &self.config
    }

    /// Whether a process matching the pattern exists. Errors read as "not running".
    pub async fn is_running(&self) -> bool {
        let spec = CommandSpec::new("pgrep").args(["-f", self.config.process_pattern.as_str()]);
        match self.runner.run(&spec).await {
            Ok(out) => {
                let running = out.success();
                debug!(running, "slideshow process check");
                running
            }
            Err(e) => {
                warn!(error = %e, "slideshow process check failed");
                false
            }
        }
    }

    /// Launch the start script detached from the daemon.
    pub async fn start(&self) {
        let spec = CommandSpec::new(self.config.start_command.to_string_lossy()).session(&self.session);
        match self.runner.spawn(&spec).await {
            Ok(()) => info!(command = %spec.command_line(), "slideshow started"),
            Err(e) => warn!(error = %e, "slideshow start failed"),
        }
    }

    /// Kill every matching process. Nothing running is not an error.
    pub async fn stop(&self) {
        let spec = CommandSpec::new("pkill").args(["-f", self.config.process_pattern.as_str()]);
        match self.runner.run(&spec).await {
            Ok(out) if out.success() => info!("slideshow stopped"),
            Ok(_) => debug!("no slideshow process to stop"),
            Err(e) => warn!(error = %e, "slideshow stop failed"),
        }
    }
}

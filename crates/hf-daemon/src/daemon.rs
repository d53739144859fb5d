use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use hf_bridge::http_api::{api_router, ApiState};
use hf_core::command::{CommandRunner, SystemRunner};
use hf_core::config::Config;
use hf_core::devices::Devices;
use hf_core::flags::FlagStore;
use hf_core::mode::ModeHandle;
use hf_core::status::{PollerStatus, SharedStatus};

use crate::poller::Poller;
use crate::shutdown::ShutdownSignal;

/// How long open dashboard connections (the stats stream never ends on its
/// own) may hold up shutdown.
const SERVER_DRAIN_TIMEOUT: Duration = Duration::from_secs(3);

/// The single supervising process: presence poller plus dashboard.
///
/// Both halves share the device wrappers, the mode handle and the poller
/// status. Shuts down when the `ShutdownSignal` is triggered.
pub struct Daemon {
    config: Config,
    devices: Devices,
    mode: ModeHandle,
    status: SharedStatus,
    shutdown: ShutdownSignal,
}

impl Daemon {
    /// Daemon that runs real OS commands.
    pub fn new(config: Config) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner::new()))
    }

    /// Daemon whose commands all go through `runner`.
    pub fn with_runner(config: Config, runner: Arc<dyn CommandRunner>) -> Self {
        let devices = Devices::from_config(&config, runner);
        let mode = ModeHandle::new(FlagStore::new(&config.flags));
        Self {
            config,
            devices,
            mode,
            status: Arc::new(RwLock::new(PollerStatus::default())),
            shutdown: ShutdownSignal::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mode(&self) -> &ModeHandle {
        &self.mode
    }

    /// Get a handle to trigger shutdown from outside.
    pub fn shutdown_handle(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    fn api_state(&self) -> Arc<ApiState> {
        Arc::new(ApiState::new(
            &self.config,
            self.devices.clone(),
            self.mode.clone(),
            self.status.clone(),
        ))
    }

    fn poller(&self) -> Poller {
        Poller::new(
            self.devices.clone(),
            self.mode.clone(),
            self.status.clone(),
            self.config.schedule.clone(),
            self.config.monitor.clone(),
        )
    }

    /// Bind the configured dashboard address and run until shutdown.
    pub async fn run(&self) -> Result<()> {
        let bind_addr = self.config.dashboard.bind_addr();
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("failed to bind dashboard on {bind_addr}"))?;
        self.run_with_listener(listener).await
    }

    /// Run using a pre-bound listener (e.g. port 0 in tests).
    pub async fn run_with_listener(&self, listener: tokio::net::TcpListener) -> Result<()> {
        if !self.config.presence.has_signal() {
            warn!("no phone address configured, the frame will stay off in auto mode");
        }
        info!(mode = %self.mode.current(), "starting");

        let bind_addr = listener.local_addr()?;
        let app = api_router(self.api_state());
        let server_shutdown = self.shutdown.clone();
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_shutdown.wait().await })
                .await
        });
        info!(%bind_addr, "dashboard listening");

        self.poller().run(self.shutdown.clone()).await;

        match tokio::time::timeout(SERVER_DRAIN_TIMEOUT, &mut server).await {
            Ok(Ok(Ok(()))) => info!("dashboard stopped"),
            Ok(Ok(Err(e))) => error!(error = %e, "dashboard server error"),
            Ok(Err(e)) => error!(error = %e, "dashboard task failed"),
            Err(_) => {
                warn!("dashboard connections still open, closing them");
                server.abort();
            }
        }
        info!("daemon stopped");
        Ok(())
    }
}

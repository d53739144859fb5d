//! homeframe daemon: starts the dashboard and the presence poller.

use anyhow::{Context, Result};
use hf_core::config::{Config, LogFormat};
use hf_daemon::daemon::Daemon;
use hf_daemon::shutdown::ShutdownSignal;
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("failed to load config")?;

    hf_telemetry::logging::init(
        "hf-daemon",
        &config.general.log_level,
        config.general.log_format == LogFormat::Json,
    );
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %Config::resolve_path().display(),
        "homeframe daemon starting"
    );

    let daemon = Daemon::new(config);
    tokio::spawn(forward_signals(daemon.shutdown_handle()));

    daemon.run().await
}

/// Trigger shutdown on ctrl-c or SIGTERM (systemd stop).
async fn forward_signals(shutdown: ShutdownSignal) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received SIGTERM"),
    }
    shutdown.trigger();
}

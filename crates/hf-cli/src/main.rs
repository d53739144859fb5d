mod commands;

use clap::{Parser, Subcommand};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// homeframe CLI -- control the photo frame through its dashboard.
#[derive(Parser)]
#[command(name = "hf", version, about)]
struct Cli {
    /// Dashboard base URL.
    #[arg(long, env = "HOMEFRAME_URL", default_value = "http://127.0.0.1:5000", global = true)]
    url: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show mode, brightness and the last poller cycle (default).
    Status {
        /// Print the raw JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Turn the screen on and hold it on (manual mode).
    On,

    /// Turn the screen off and hold it off (manual mode).
    Off,

    /// Hand control back to the presence poller.
    Auto,

    /// Set the monitor brightness.
    Brightness {
        /// Level between 0 and 100.
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        level: u8,
    },

    /// Reboot the frame.
    Reboot {
        /// Confirm the reboot.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hf_telemetry::logging::init_logging("hf", "warn");
    let cli = Cli::parse();
    let url = cli.url.trim_end_matches('/');

    match cli.command {
        None => commands::status::run(url, false).await?,
        Some(Commands::Status { json }) => commands::status::run(url, json).await?,
        Some(Commands::On) => commands::screen::run(url, commands::screen::Action::On).await?,
        Some(Commands::Off) => commands::screen::run(url, commands::screen::Action::Off).await?,
        Some(Commands::Auto) => commands::screen::run(url, commands::screen::Action::Auto).await?,
        Some(Commands::Brightness { level }) => commands::brightness::run(url, level).await?,
        Some(Commands::Reboot { yes }) => commands::reboot::run(url, yes).await?,
    }

    Ok(())
}

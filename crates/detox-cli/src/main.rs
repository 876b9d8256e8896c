mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::settings::AppsAction;

#[derive(Parser)]
#[command(name = "detox")]
#[command(about = "Gentle reminders when continuous app usage runs long", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Turn monitoring on and start the daemon
    Start,
    /// (Internal) Run the daemon process
    #[command(hide = true)]
    DaemonInternalStart,
    /// Turn monitoring off and stop the daemon
    Stop,
    /// Restart the daemon if monitoring was left on (for login hooks)
    Resume,
    /// Show the current session
    Status,
    /// Show or set the continuous-usage limit in minutes
    Limit {
        /// New limit; omit to show the current one
        minutes: Option<u32>,
    },
    /// Manage watched apps
    Apps {
        #[command(subcommand)]
        action: AppsAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::DaemonInternalStart) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .init();
    }

    match cli.command {
        Commands::Start => commands::daemon::start_daemon(),
        Commands::DaemonInternalStart => commands::daemon::run_daemon_process().await,
        Commands::Stop => commands::daemon::stop_daemon().await,
        Commands::Resume => commands::daemon::resume_daemon(),
        Commands::Status => commands::daemon::show_status().await,
        Commands::Limit { minutes } => commands::settings::limit_command(minutes),
        Commands::Apps { action } => commands::settings::apps_command(action),
    }
}

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exo_installer_lib::core::state::{default_data_dir, InstallerSettings};
use exo_installer_lib::Action;

#[derive(Parser)]
#[command(name = "exo-installer")]
#[command(version)]
#[command(about = "Install, update and launch the game client")]
struct Cli {
    /// Override the remote configuration URL
    #[arg(long, global = true)]
    config_url: Option<String>,

    /// Directory holding installer settings and version state
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the configuration and show the installed version status
    Status,

    /// Install the game, or update an existing install
    Install {
        /// Install directory (defaults to the previous install or the games folder)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Download and reinstall the current version in place
    Repair,

    /// Start the installed game
    Launch,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    exo_installer_lib::init_logging(cli.verbose);

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let mut settings = InstallerSettings::load_in(&data_dir);
    if let Some(url) = cli.config_url {
        settings.config_url = url;
    }

    let action = match cli.command {
        Commands::Status => Action::Status,
        Commands::Install { dir } => Action::Install { dir },
        Commands::Repair => Action::Repair,
        Commands::Launch => Action::Launch,
    };

    match exo_installer_lib::run(settings, action).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

pub mod commands;
pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::commands::Action;
use crate::core::error::InstallerResult;
use crate::core::state::InstallerSettings;

/// Install the global tracing subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        "debug"
    } else {
        "info,exo_installer_lib=debug"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

pub async fn run(settings: InstallerSettings, action: Action) -> InstallerResult<()> {
    tracing::info!("ExoInstaller {} starting...", env!("CARGO_PKG_VERSION"));
    commands::run_action(&settings, action).await
}

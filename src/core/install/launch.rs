use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{info, warn};

use crate::core::error::{InstallerError, InstallerResult};

/// Full path of the game executable inside a resolved install directory.
pub fn executable_path(install_dir: &Path, exe_name: &str) -> PathBuf {
    install_dir.join(exe_name)
}

/// Open the game executable through the host's default "open" mechanism.
///
/// Returns `Ok(false)` if the executable does not exist.
pub async fn launch_game(exe_path: &Path) -> InstallerResult<bool> {
    if !exe_path.is_file() {
        warn!("Cannot launch, executable missing: {:?}", exe_path);
        return Ok(false);
    }

    let mut command = open_command(exe_path);
    if let Some(dir) = exe_path.parent() {
        command.current_dir(dir);
    }

    info!("Launching {:?}", exe_path);
    let status = command
        .status()
        .await
        .map_err(|e| InstallerError::LaunchFailed {
            path: exe_path.to_path_buf(),
            detail: e.to_string(),
        })?;

    if !status.success() {
        return Err(InstallerError::LaunchFailed {
            path: exe_path.to_path_buf(),
            detail: format!("opener exited with {status}"),
        });
    }
    Ok(true)
}

#[cfg(target_os = "windows")]
fn open_command(path: &Path) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", ""]).arg(path);
    cmd
}

#[cfg(target_os = "macos")]
fn open_command(path: &Path) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(path);
    cmd
}

#[cfg(all(unix, not(target_os = "macos")))]
fn open_command(path: &Path) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(path);
    cmd
}

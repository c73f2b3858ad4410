// ─── Desktop Shortcut ───
// Best-effort launch entry on the user's desktop. Failures are logged and
// reported as `false`, never propagated.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::naming::sanitize_file_name;
use crate::core::error::{InstallerError, InstallerResult};

#[derive(Debug, Clone)]
pub struct ShortcutManager {
    desktop_dir: Option<PathBuf>,
}

impl ShortcutManager {
    pub fn new(desktop_dir: Option<PathBuf>) -> Self {
        Self { desktop_dir }
    }

    /// Create a desktop entry launching `target` from its own directory.
    pub async fn create_shortcut(&self, target: &Path, display_name: &str) -> bool {
        match self.try_create(target, display_name).await {
            Ok(path) => {
                info!("Created desktop shortcut {:?}", path);
                true
            }
            Err(e) => {
                warn!("Shortcut error: {}", e);
                false
            }
        }
    }

    async fn try_create(&self, target: &Path, display_name: &str) -> InstallerResult<PathBuf> {
        let desktop = self
            .desktop_dir
            .as_deref()
            .ok_or_else(|| InstallerError::Shortcut("no desktop directory".into()))?;
        if !target.is_file() {
            return Err(InstallerError::Shortcut(format!(
                "target {:?} does not exist",
                target
            )));
        }
        let working_dir = target
            .parent()
            .ok_or_else(|| InstallerError::Shortcut(format!("{:?} has no parent", target)))?;

        tokio::fs::create_dir_all(desktop)
            .await
            .map_err(|e| InstallerError::Shortcut(format!("{:?}: {e}", desktop)))?;

        let file_stem = sanitize_file_name(display_name, "Game");
        write_platform_shortcut(desktop, &file_stem, display_name, target, working_dir).await
    }
}

#[cfg(target_os = "windows")]
async fn write_platform_shortcut(
    desktop: &Path,
    file_stem: &str,
    _display_name: &str,
    target: &Path,
    working_dir: &Path,
) -> InstallerResult<PathBuf> {
    let link_path = desktop.join(format!("{file_stem}.lnk"));
    let script = format!(
        "$s = (New-Object -ComObject WScript.Shell).CreateShortcut('{link}'); \
         $s.TargetPath = '{target}'; $s.WorkingDirectory = '{cwd}'; \
         $s.IconLocation = '{target},0'; $s.Save()",
        link = ps_quote(&link_path),
        target = ps_quote(target),
        cwd = ps_quote(working_dir),
    );

    let output = tokio::process::Command::new("powershell")
        .args(["-NoProfile", "-NonInteractive", "-Command", &script])
        .output()
        .await
        .map_err(|e| InstallerError::Shortcut(format!("powershell: {e}")))?;

    if !output.status.success() {
        return Err(InstallerError::Shortcut(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(link_path)
}

#[cfg(target_os = "windows")]
fn ps_quote(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "''")
}

#[cfg(target_os = "macos")]
async fn write_platform_shortcut(
    desktop: &Path,
    file_stem: &str,
    _display_name: &str,
    target: &Path,
    working_dir: &Path,
) -> InstallerResult<PathBuf> {
    let script_path = desktop.join(format!("{file_stem}.command"));
    let contents = format!(
        "#!/bin/sh\ncd \"{}\" && exec open \"{}\"\n",
        working_dir.display(),
        target.display()
    );
    write_executable(&script_path, contents).await?;
    Ok(script_path)
}

#[cfg(all(unix, not(target_os = "macos")))]
async fn write_platform_shortcut(
    desktop: &Path,
    file_stem: &str,
    display_name: &str,
    target: &Path,
    working_dir: &Path,
) -> InstallerResult<PathBuf> {
    let entry_path = desktop.join(format!("{file_stem}.desktop"));
    let contents = desktop_entry(display_name, target, working_dir);
    write_executable(&entry_path, contents).await?;
    Ok(entry_path)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn desktop_entry(display_name: &str, target: &Path, working_dir: &Path) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name={display_name}\n\
         Exec=\"{exec}\"\n\
         Path={cwd}\n\
         Icon={exec}\n\
         Terminal=false\n\
         Categories=Game;\n",
        exec = target.display(),
        cwd = working_dir.display(),
    )
}

#[cfg(unix)]
async fn write_executable(path: &Path, contents: String) -> InstallerResult<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::write(path, contents)
        .await
        .map_err(|e| InstallerError::Shortcut(format!("{:?}: {e}", path)))?;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|e| InstallerError::Shortcut(format!("{:?}: {e}", path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_desktop_dir_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("game.exe");
        std::fs::write(&exe, b"MZ").unwrap();

        assert!(!ShortcutManager::new(None).create_shortcut(&exe, "Exo").await);
    }

    #[tokio::test]
    async fn missing_target_returns_false() {
        let desktop = tempfile::tempdir().unwrap();
        let manager = ShortcutManager::new(Some(desktop.path().to_path_buf()));

        assert!(
            !manager
                .create_shortcut(&desktop.path().join("absent.exe"), "Exo")
                .await
        );
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[tokio::test]
    async fn writes_desktop_entry() {
        let desktop = tempfile::tempdir().unwrap();
        let game = tempfile::tempdir().unwrap();
        let exe = game.path().join("Client").join("Silkroad.exe");
        std::fs::create_dir_all(exe.parent().unwrap()).unwrap();
        std::fs::write(&exe, b"MZ").unwrap();

        let manager = ShortcutManager::new(Some(desktop.path().to_path_buf()));
        assert!(manager.create_shortcut(&exe, "Exo Online").await);

        let entry = std::fs::read_to_string(desktop.path().join("Exo Online.desktop")).unwrap();
        assert!(entry.contains("Name=Exo Online"));
        assert!(entry.contains(&format!("Exec=\"{}\"", exe.display())));
        assert!(entry.contains(&format!("Path={}", exe.parent().unwrap().display())));
    }
}

// ─── Installer Settings ───
// Local configuration of the installer itself: where to fetch the game
// configuration from, where to persist state, and transport tunables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const APP_DIR_NAME: &str = "ExoInstaller";
const SETTINGS_FILE: &str = "installer_settings.json";
const VERSION_FILE: &str = "version.json";
const LOCAL_CONFIG_FILE: &str = "config.json";
const DEFAULT_CONFIG_URL: &str = "http://26.26.167.193/exotic/config.json";

pub const CONFIG_URL_ENV: &str = "EXO_CONFIG_URL";
pub const DATA_DIR_ENV: &str = "EXO_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerSettings {
    pub config_url: String,
    /// Bundled fallback configuration, used only when the remote fetch fails.
    pub local_config_path: PathBuf,
    /// Persisted version-state record.
    pub version_file: PathBuf,
    /// Parent directory for default install locations.
    pub games_root: PathBuf,
    /// Where desktop shortcuts are written. `None` disables shortcuts.
    pub desktop_dir: Option<PathBuf>,
    pub config_timeout_secs: u64,
    pub download_idle_timeout_secs: u64,
    pub max_redirects: usize,
    pub progress_interval_ms: u64,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self::for_data_dir(&default_data_dir())
    }
}

impl InstallerSettings {
    /// Defaults rooted at `data_dir`.
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            config_url: DEFAULT_CONFIG_URL.to_string(),
            local_config_path: bundled_config_path(),
            version_file: data_dir.join(VERSION_FILE),
            games_root: default_games_root(),
            desktop_dir: dirs::desktop_dir(),
            config_timeout_secs: 10,
            download_idle_timeout_secs: 30,
            max_redirects: 5,
            progress_interval_ms: 200,
        }
    }

    /// Load settings from `data_dir`, applying environment overrides.
    /// Missing or corrupt settings files fall back to defaults.
    pub fn load_in(data_dir: &Path) -> Self {
        let mut settings = Self::load_from(data_dir);
        if let Ok(url) = std::env::var(CONFIG_URL_ENV) {
            if !url.trim().is_empty() {
                settings.config_url = url;
            }
        }
        settings
    }

    pub fn load_from(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => {
                debug!("No settings file at {:?}, using defaults", path);
                return Self::for_data_dir(data_dir);
            }
        };

        // Fields missing from the file take the defaults for *this* data dir.
        let defaults = serde_json::to_value(Self::for_data_dir(data_dir));
        let merged = defaults.and_then(|mut base| {
            let overlay: serde_json::Value = serde_json::from_str(&raw)?;
            if let (Some(base_map), serde_json::Value::Object(overlay_map)) =
                (base.as_object_mut(), overlay)
            {
                base_map.extend(overlay_map);
            }
            serde_json::from_value(base)
        });

        match merged {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Corrupt settings file at {:?}: {}", path, e);
                Self::for_data_dir(data_dir)
            }
        }
    }

    pub fn config_timeout(&self) -> Duration {
        Duration::from_secs(self.config_timeout_secs)
    }

    pub fn download_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.download_idle_timeout_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// Per-user application data directory, honouring `EXO_DATA_DIR`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

fn bundled_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(LOCAL_CONFIG_FILE)))
        .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE))
}

fn default_games_root() -> PathBuf {
    if cfg!(target_os = "windows") {
        PathBuf::from(r"C:\Games")
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Games")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_rooted_at_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = InstallerSettings::load_from(dir.path());
        assert_eq!(settings.version_file, dir.path().join("version.json"));
        assert_eq!(settings.config_timeout(), Duration::from_secs(10));
        assert_eq!(settings.download_idle_timeout(), Duration::from_secs(30));
        assert_eq!(settings.max_redirects, 5);
    }

    #[test]
    fn partial_settings_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "config_url": "http://localhost/config.json", "max_redirects": 2 }"#,
        )
        .unwrap();

        let settings = InstallerSettings::load_from(dir.path());
        assert_eq!(settings.config_url, "http://localhost/config.json");
        assert_eq!(settings.max_redirects, 2);
        assert_eq!(settings.version_file, dir.path().join("version.json"));
    }

    #[test]
    fn corrupt_settings_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();

        let settings = InstallerSettings::load_from(dir.path());
        assert_eq!(settings.config_url, DEFAULT_CONFIG_URL);
    }

    #[test]
    fn null_desktop_dir_disables_shortcuts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "desktop_dir": null, "progress_interval_ms": 50 }"#,
        )
        .unwrap();

        let loaded = InstallerSettings::load_in(dir.path());
        assert_eq!(loaded.progress_interval(), Duration::from_millis(50));
        assert!(loaded.desktop_dir.is_none());
    }
}

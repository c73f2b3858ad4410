use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::error::{InstallerError, InstallerResult};

/// Version recorded when nothing has been installed yet.
pub const NO_VERSION: &str = "0.0.0";

/// Persisted record of the last successful install.
///
/// On disk the version is stored under `game_version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionState {
    #[serde(rename = "game_version", default = "no_version")]
    pub installed_version: String,
    /// Directory that directly contains the game executable.
    #[serde(default)]
    pub install_path: String,
    /// Directory the archive was extracted into. May be an ancestor of
    /// `install_path` when the archive nests its content.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub install_root: String,
}

fn no_version() -> String {
    NO_VERSION.to_string()
}

impl Default for VersionState {
    fn default() -> Self {
        Self {
            installed_version: no_version(),
            install_path: String::new(),
            install_root: String::new(),
        }
    }
}

impl VersionState {
    pub fn new(installed_version: impl Into<String>, install_path: impl Into<String>) -> Self {
        Self {
            installed_version: installed_version.into(),
            install_path: install_path.into(),
            install_root: String::new(),
        }
    }

    pub fn with_install_root(mut self, install_root: impl Into<String>) -> Self {
        self.install_root = install_root.into();
        self
    }

    pub fn has_install(&self) -> bool {
        self.installed_version != NO_VERSION
    }

    pub fn install_dir(&self) -> Option<PathBuf> {
        non_empty_path(&self.install_path)
    }

    /// Where the next install or repair should extract to: the recorded
    /// extraction root, or the executable directory for older records.
    pub fn extraction_root(&self) -> Option<PathBuf> {
        non_empty_path(&self.install_root).or_else(|| self.install_dir())
    }
}

fn non_empty_path(raw: &str) -> Option<PathBuf> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(PathBuf::from(raw))
    }
}

/// Reads and writes the version-state file.
#[derive(Debug, Clone)]
pub struct VersionStateStore {
    path: PathBuf,
}

impl VersionStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state. Never fails: a missing or unreadable
    /// record yields the default `{ "0.0.0", "" }`.
    pub async fn load(&self) -> VersionState {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No version state at {:?} ({}), assuming fresh machine", self.path, e);
                return VersionState::default();
            }
        };

        match serde_json::from_str::<VersionState>(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!("Corrupt version state at {:?}: {}", self.path, e);
                VersionState::default()
            }
        }
    }

    /// Overwrite the persisted state.
    ///
    /// Writes a sibling temp file and renames it over the record, so readers
    /// see either the old or the new state.
    pub async fn save(&self, state: &VersionState) -> InstallerResult<()> {
        let persist_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| InstallerError::Persist { path, source }
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(persist_err(parent))?;
            }
        }

        let json = serde_json::to_string_pretty(state)?;
        let tmp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(persist_err(&tmp_path))?;

        if let Err(source) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(InstallerError::Persist {
                path: self.path.clone(),
                source,
            });
        }

        info!(
            "Saved version state {} at {:?}",
            state.installed_version, state.install_path
        );
        Ok(())
    }
}

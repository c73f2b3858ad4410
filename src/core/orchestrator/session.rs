use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::stage::VersionCheck;
use crate::core::config::{RemoteConfig, DEFAULT_GAME_NAME};
use crate::core::install::{executable_path, sanitize_file_name};
use crate::core::state::VersionState;

/// Working state of one install/update/repair session.
///
/// Owned by the orchestrator and handed to each transition; the
/// presentation layer only ever sees copies of its parts.
#[derive(Debug, Clone)]
pub struct InstallSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub config: RemoteConfig,
    pub version_state: VersionState,
    pub check: VersionCheck,
    /// Directory the archive is downloaded and extracted into.
    pub selected_dir: PathBuf,
    /// Directory holding the executable, once located.
    pub resolved_install_path: Option<PathBuf>,
    /// Executable as found on disk. Its file name may differ in case from
    /// `config.exe_name`.
    pub resolved_exe: Option<PathBuf>,
}

impl InstallSession {
    pub fn new(
        config: RemoteConfig,
        version_state: VersionState,
        check: VersionCheck,
        games_root: &Path,
    ) -> Self {
        let selected_dir = default_install_dir(&config, &version_state, games_root);
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            config,
            version_state,
            check,
            selected_dir,
            resolved_install_path: None,
            resolved_exe: None,
        }
    }

    /// Directory to launch from: the one resolved by this session, else the
    /// persisted one, else the selected one.
    pub fn launch_dir(&self) -> PathBuf {
        self.resolved_install_path
            .clone()
            .or_else(|| self.version_state.install_dir())
            .unwrap_or_else(|| self.selected_dir.clone())
    }

    pub fn exe_path(&self) -> PathBuf {
        self.resolved_exe
            .clone()
            .unwrap_or_else(|| executable_path(&self.launch_dir(), &self.config.exe_name))
    }
}

/// Previously used directory if any, otherwise `<games_root>/<game name>`.
/// The game name comes from the remote config and is reduced to a single
/// plain path component, so the result always stays under `games_root`.
pub fn default_install_dir(
    config: &RemoteConfig,
    version_state: &VersionState,
    games_root: &Path,
) -> PathBuf {
    version_state
        .extraction_root()
        .unwrap_or_else(|| {
            games_root.join(sanitize_file_name(config.display_name(), DEFAULT_GAME_NAME))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RemoteConfig {
        serde_json::from_str(
            r#"{ "game_name": "Exo Online", "exe_name": "Silkroad.exe",
                 "game_version": "1.2.0", "client_url": "http://x/Exo.zip" }"#,
        )
        .unwrap()
    }

    #[test]
    fn fresh_install_defaults_under_games_root() {
        let session = InstallSession::new(
            config(),
            VersionState::default(),
            VersionCheck::FirstInstall,
            Path::new("/games"),
        );
        assert_eq!(session.selected_dir, PathBuf::from("/games/Exo Online"));
        assert_eq!(
            session.exe_path(),
            PathBuf::from("/games/Exo Online/Silkroad.exe")
        );
    }

    #[test]
    fn previous_install_path_is_reused() {
        let state = VersionState::new("1.1.0", "/opt/Exo/Client").with_install_root("/opt/Exo");
        let session = InstallSession::new(
            config(),
            state,
            VersionCheck::UpdateAvailable,
            Path::new("/games"),
        );
        assert_eq!(session.selected_dir, PathBuf::from("/opt/Exo"));
        assert_eq!(session.launch_dir(), PathBuf::from("/opt/Exo/Client"));
    }

    #[test]
    fn blank_game_name_uses_fallback() {
        let mut config = config();
        config.game_name = String::new();
        let dir = default_install_dir(&config, &VersionState::default(), Path::new("/games"));
        assert_eq!(dir, PathBuf::from("/games/ExoGame"));
    }

    #[test]
    fn found_executable_wins_over_configured_name() {
        let mut session = InstallSession::new(
            config(),
            VersionState::default(),
            VersionCheck::FirstInstall,
            Path::new("/games"),
        );
        session.resolved_install_path = Some(PathBuf::from("/games/Exo Online/Client"));
        assert_eq!(
            session.exe_path(),
            PathBuf::from("/games/Exo Online/Client/Silkroad.exe")
        );

        session.resolved_exe = Some(PathBuf::from("/games/Exo Online/Client/silkroad.EXE"));
        assert_eq!(
            session.exe_path(),
            PathBuf::from("/games/Exo Online/Client/silkroad.EXE")
        );
    }

    #[test]
    fn remote_game_name_cannot_escape_games_root() {
        let root = Path::new("/games");
        for name in ["../x", "/etc", r"C:\Windows", "..", "a/../../b"] {
            let mut config = config();
            config.game_name = name.to_string();
            let dir = default_install_dir(&config, &VersionState::default(), root);

            assert_eq!(dir.parent(), Some(root), "{name} -> {dir:?}");
            assert!(
                dir.components().all(|c| !matches!(c, std::path::Component::ParentDir)),
                "{name} -> {dir:?}"
            );
        }

        let mut config = config();
        config.game_name = "../x".into();
        assert_eq!(
            default_install_dir(&config, &VersionState::default(), root),
            PathBuf::from("/games/..x")
        );
        config.game_name = "..".into();
        assert_eq!(
            default_install_dir(&config, &VersionState::default(), root),
            PathBuf::from("/games/ExoGame")
        );
    }
}

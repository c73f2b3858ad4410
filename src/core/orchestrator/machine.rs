// ─── Install Orchestrator ───
// Sequences config resolution, the version check and the
// download → extract → locate → finalize pipeline. The presentation layer
// drives it with intents and observes it through `InstallerEvent`s.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::events::{CancelHandle, EventSink, InstallerEvent, Intent, LogLevel};
use super::session::{default_install_dir, InstallSession};
use super::stage::{check_version, Stage, Step, VersionCheck};
use crate::core::archive::ArchiveExtractor;
use crate::core::config::{ConfigResolver, ConfigSource};
use crate::core::downloader::Downloader;
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::install::{
    ensure_disk_space, executable_path, launch_game, ExecutableLocator, ShortcutManager,
};
use crate::core::state::{InstallerSettings, VersionState, VersionStateStore};

/// Services the orchestrator invokes, one per pipeline concern.
pub struct InstallerServices {
    pub config: Arc<dyn ConfigSource>,
    pub store: VersionStateStore,
    pub downloader: Downloader,
    pub extractor: ArchiveExtractor,
    pub locator: ExecutableLocator,
    pub shortcuts: ShortcutManager,
}

impl InstallerServices {
    pub fn from_settings(settings: &InstallerSettings) -> InstallerResult<Self> {
        Ok(Self {
            config: Arc::new(ConfigResolver::from_settings(settings)?),
            store: VersionStateStore::new(settings.version_file.clone()),
            downloader: Downloader::from_settings(settings)?,
            extractor: ArchiveExtractor::new(),
            locator: ExecutableLocator::new(),
            shortcuts: ShortcutManager::new(settings.desktop_dir.clone()),
        })
    }
}

/// Why the pipeline stopped before reaching `Ready`.
enum Interrupt {
    Cancelled,
    Failed(Step, InstallerError),
}

pub struct InstallOrchestrator {
    services: InstallerServices,
    games_root: PathBuf,
    stage: Stage,
    session: Option<InstallSession>,
    events: EventSink,
    cancel: CancelHandle,
}

impl InstallOrchestrator {
    pub fn new(settings: &InstallerSettings, services: InstallerServices) -> Self {
        Self {
            services,
            games_root: settings.games_root.clone(),
            stage: Stage::Init,
            session: None,
            events: EventSink::default(),
            cancel: CancelHandle::new(),
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn session(&self) -> Option<&InstallSession> {
        self.session.as_ref()
    }

    /// Handle for abandoning a running install from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Stop sending events. Running transfers are unaffected.
    pub fn detach_observer(&mut self) {
        self.events = EventSink::default();
    }

    // ── Session start ─────────────────────────────────

    /// Resolve the configuration and compare it against the persisted state.
    ///
    /// Always starts a fresh session; any previous one is discarded.
    pub async fn start(&mut self) -> InstallerResult<VersionCheck> {
        self.cancel.reset();
        self.session = None;
        self.set_stage(Stage::Init);

        let config = match self.services.config.resolve().await {
            Ok(config) => config,
            Err(e) => {
                self.fail(Step::Config, &e);
                return Err(e);
            }
        };
        info!(
            "Resolved config for {} {} ({:?})",
            config.display_name(),
            config.game_version,
            config.origin
        );
        self.set_stage(Stage::ConfigResolved);

        let version_state = self.services.store.load().await;
        let check = check_version(&version_state.installed_version, &config.game_version);
        self.set_stage(Stage::VersionChecked);

        let session = InstallSession::new(config, version_state, check, &self.games_root);
        info!(
            session = %session.id,
            "Installed {} / available {}: {:?}",
            session.version_state.installed_version,
            session.config.game_version,
            check
        );
        self.session = Some(session);
        self.set_stage(Stage::from_check(check));
        Ok(check)
    }

    // ── Intents ───────────────────────────────────────

    /// Apply one intent and return the stage it leaves the session in.
    ///
    /// An intent that is not valid for the current stage returns
    /// `InvalidTransition` and changes nothing.
    pub async fn handle(&mut self, intent: Intent) -> InstallerResult<Stage> {
        debug!("Intent {} in stage {}", intent.name(), self.stage);

        match (self.stage.clone(), intent) {
            (Stage::FirstInstall | Stage::UpdateAvailable, Intent::Continue) => {
                self.set_stage(Stage::SelectingDirectory);
            }
            (Stage::SelectingDirectory, Intent::SelectDirectory(dir)) => {
                let session = self.active_session("select_directory")?;
                info!("Install directory set to {:?}", dir);
                session.selected_dir = dir;
            }
            (Stage::SelectingDirectory, Intent::StartInstall) => {
                self.run_pipeline().await?;
            }
            (Stage::UpToDate | Stage::Ready, Intent::Repair) => {
                let games_root = self.games_root.clone();
                let session = self.active_session("repair")?;
                session.selected_dir =
                    default_install_dir(&session.config, &session.version_state, &games_root);
                info!("Repairing install in {:?}", session.selected_dir);
                self.run_pipeline().await?;
            }
            (Stage::UpToDate | Stage::Ready, Intent::Launch) => {
                self.launch().await?;
            }
            (stage, Intent::Cancel) if !stage.is_running() => {
                self.abandon();
            }
            (stage, intent) => {
                return Err(InstallerError::InvalidTransition {
                    stage: stage.name().to_string(),
                    intent: intent.name().to_string(),
                });
            }
        }

        Ok(self.stage.clone())
    }

    fn active_session(&mut self, intent: &str) -> InstallerResult<&mut InstallSession> {
        let stage = self.stage.name();
        self.session
            .as_mut()
            .ok_or_else(|| InstallerError::InvalidTransition {
                stage: stage.to_string(),
                intent: intent.to_string(),
            })
    }

    // ── Pipeline ──────────────────────────────────────

    async fn run_pipeline(&mut self) -> InstallerResult<()> {
        let Some(session) = self.session.clone() else {
            return Err(InstallerError::Other("no active install session".into()));
        };
        // Only a cancel issued while this run is in flight applies to it.
        self.cancel.reset();
        let span = info_span!("install", session = %session.id);

        match self.drive(session).instrument(span).await {
            Ok(session) => {
                let exe_path = session.exe_path();
                self.session = Some(session);
                self.set_stage(Stage::Ready);
                self.events.emit(InstallerEvent::Ready { exe_path });
                Ok(())
            }
            Err(Interrupt::Cancelled) => {
                warn!("Install cancelled; any running transfer is left to finish on its own");
                self.abandon();
                Ok(())
            }
            Err(Interrupt::Failed(step, e)) => {
                self.fail(step, &e);
                if e.is_fatal_for_session() {
                    self.session = None;
                } else {
                    self.set_stage(Stage::SelectingDirectory);
                }
                Err(e)
            }
        }
    }

    async fn drive(&mut self, mut session: InstallSession) -> Result<InstallSession, Interrupt> {
        let dir = session.selected_dir.clone();
        let config = session.config.clone();

        ensure_disk_space(&dir, config.file_size_mb)
            .await
            .map_err(|e| Interrupt::Failed(Step::Directory, e))?;
        tokio::fs::create_dir_all(&dir).await.map_err(|source| {
            Interrupt::Failed(
                Step::Directory,
                InstallerError::DirectoryCreate {
                    path: dir.clone(),
                    source,
                },
            )
        })?;

        // Download
        self.set_stage(Stage::Downloading);
        let archive = {
            let downloader = self.services.downloader.clone();
            let events = self.events.clone();
            let url = config.client_url.clone();
            let file_name = config.archive_file_name();
            let dest_dir = dir.clone();
            let handle = tokio::spawn(async move {
                downloader
                    .download(&url, &dest_dir, &file_name, move |progress| {
                        events.emit(InstallerEvent::DownloadProgress(progress))
                    })
                    .await
            });
            self.until_cancelled(handle, Step::Download).await?
        };

        // Extract
        self.set_stage(Stage::Extracting);
        {
            let extractor = self.services.extractor.clone();
            let events = self.events.clone();
            let archive_path = archive.clone();
            let dest_dir = dir.clone();
            let handle = tokio::spawn(async move {
                extractor
                    .extract(&archive_path, &dest_dir, move |progress| {
                        events.emit(InstallerEvent::ExtractProgress(progress))
                    })
                    .await
            });
            self.until_cancelled(handle, Step::Extract).await?;
        }
        if let Err(e) = tokio::fs::remove_file(&archive).await {
            warn!("Could not remove archive {:?}: {}", archive, e);
        }

        // Locate
        self.set_stage(Stage::Locating);
        let found = self.locate(&dir, &config.exe_name).await;
        let resolved = found
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dir.clone());
        let exe = found.unwrap_or_else(|| executable_path(&resolved, &config.exe_name));

        // Finalize
        self.set_stage(Stage::Finalizing);
        let state = VersionState::new(
            config.game_version.clone(),
            resolved.to_string_lossy().into_owned(),
        )
        .with_install_root(dir.to_string_lossy().into_owned());
        self.services
            .store
            .save(&state)
            .await
            .map_err(|e| Interrupt::Failed(Step::Finalize, e))?;

        if !self
            .services
            .shortcuts
            .create_shortcut(&exe, config.display_name())
            .await
        {
            self.events
                .log(LogLevel::Warn, "Desktop shortcut could not be created");
        }

        session.version_state = state;
        session.resolved_install_path = Some(resolved);
        session.resolved_exe = Some(exe);
        session.check = VersionCheck::UpToDate;
        Ok(session)
    }

    /// Await a spawned stage task unless the session is cancelled first.
    /// On cancellation the task is detached, not aborted.
    async fn until_cancelled<T>(
        &self,
        handle: JoinHandle<InstallerResult<T>>,
        step: Step,
    ) -> Result<T, Interrupt> {
        let mut cancelled = self.cancel.subscribe();
        tokio::select! {
            joined = handle => match joined {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(Interrupt::Failed(step, e)),
                Err(e) => Err(Interrupt::Failed(
                    step,
                    InstallerError::Other(format!("{step} task failed: {e}")),
                )),
            },
            _ = cancelled.wait_for(|c| *c) => Err(Interrupt::Cancelled),
        }
    }

    /// The executable as found under `dir`. `None` degrades the install to
    /// `dir` itself; it is logged, never a failure.
    async fn locate(&self, dir: &Path, exe_name: &str) -> Option<PathBuf> {
        match self.services.locator.find(dir, exe_name).await {
            Ok(Some(exe)) => {
                info!("Found {:?}", exe);
                Some(exe)
            }
            Ok(None) => {
                let e = InstallerError::ExecutableNotFound {
                    base_dir: dir.to_path_buf(),
                    exe_name: exe_name.to_string(),
                };
                warn!("{}; using {:?}", e, dir);
                self.events.log(LogLevel::Warn, e.to_string());
                None
            }
            Err(e) => {
                warn!("Executable search failed: {}; using {:?}", e, dir);
                self.events.log(LogLevel::Warn, e.to_string());
                None
            }
        }
    }

    // ── Launch ────────────────────────────────────────

    async fn launch(&mut self) -> InstallerResult<()> {
        let session = self.active_session("launch")?;
        let known_exe = session.resolved_exe.clone();
        let base_dir = session.launch_dir();
        let exe_name = session.config.exe_name.clone();

        let exe = match known_exe {
            Some(exe) => exe,
            None => self.installed_exe(&base_dir, &exe_name).await,
        };

        let result = match launch_game(&exe).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(InstallerError::ExecutableNotFound { base_dir, exe_name }),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                self.events
                    .log(LogLevel::Info, format!("Launched {}", exe.display()));
                Ok(())
            }
            Err(e) => {
                error!("Launch failed: {}", e);
                self.events.emit(InstallerEvent::Failed {
                    step: Step::Launch,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Executable of a previous install. The archive may spell the name in a
    /// different case than the config, so fall back to a case-insensitive
    /// search when the exact path is missing.
    async fn installed_exe(&self, install_dir: &Path, exe_name: &str) -> PathBuf {
        let exact = executable_path(install_dir, exe_name);
        if tokio::fs::metadata(&exact).await.is_ok() {
            return exact;
        }
        match self.services.locator.find(install_dir, exe_name).await {
            Ok(Some(found)) => found,
            _ => exact,
        }
    }

    // ── Helpers ───────────────────────────────────────

    fn set_stage(&mut self, stage: Stage) {
        debug!("Stage {} -> {}", self.stage, stage);
        self.stage = stage.clone();
        self.events.emit(InstallerEvent::StageChanged { stage });
    }

    fn fail(&mut self, step: Step, e: &InstallerError) {
        error!("{} failed: {}", step, e);
        let message = e.to_string();
        self.events.emit(InstallerEvent::Failed {
            step,
            message: message.clone(),
        });
        self.set_stage(Stage::Failed {
            step,
            detail: message,
        });
    }

    fn abandon(&mut self) {
        self.session = None;
        self.cancel.reset();
        self.events.log(LogLevel::Warn, "Install session abandoned");
        self.set_stage(Stage::Init);
    }
}

// ─── Command Handlers ───
// Headless presentation layer: each handler drives the orchestrator with
// intents and renders its events as log lines.

use std::path::PathBuf;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::core::downloader::{format_bytes, format_eta, format_speed};
use crate::core::error::InstallerResult;
use crate::core::orchestrator::{
    EventSink, InstallOrchestrator, InstallSession, InstallerEvent, InstallerServices, Intent,
    LogLevel, Stage, VersionCheck,
};
use crate::core::state::InstallerSettings;

/// What the user asked the installer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Status,
    Install { dir: Option<PathBuf> },
    Repair,
    Launch,
}

pub async fn run_action(settings: &InstallerSettings, action: Action) -> InstallerResult<()> {
    let services = InstallerServices::from_settings(settings)?;
    let (sink, rx) = EventSink::channel();
    let logger = tokio::spawn(log_events(rx));
    let mut orchestrator = InstallOrchestrator::new(settings, services).with_events(sink);

    let result = match action {
        Action::Status => status(&mut orchestrator).await,
        Action::Install { dir } => install(&mut orchestrator, dir).await,
        Action::Repair => repair(&mut orchestrator).await,
        Action::Launch => launch(&mut orchestrator).await,
    };

    // Closing the sender lets the logger drain and exit.
    drop(orchestrator);
    let _ = logger.await;
    result
}

async fn status(orchestrator: &mut InstallOrchestrator) -> InstallerResult<()> {
    orchestrator.start().await?;
    if let Some(session) = orchestrator.session() {
        for line in status_lines(session) {
            println!("{line}");
        }
    }
    Ok(())
}

async fn install(orchestrator: &mut InstallOrchestrator, dir: Option<PathBuf>) -> InstallerResult<()> {
    if orchestrator.start().await? == VersionCheck::UpToDate {
        info!("Game is up to date; use `repair` to reinstall");
        return Ok(());
    }

    orchestrator.handle(Intent::Continue).await?;
    if let Some(dir) = dir {
        orchestrator.handle(Intent::SelectDirectory(dir)).await?;
    }
    run_cancellable(orchestrator, Intent::StartInstall).await
}

async fn repair(orchestrator: &mut InstallOrchestrator) -> InstallerResult<()> {
    orchestrator.start().await?;
    run_cancellable(orchestrator, Intent::Repair).await
}

async fn launch(orchestrator: &mut InstallOrchestrator) -> InstallerResult<()> {
    orchestrator.start().await?;
    orchestrator.handle(Intent::Launch).await?;
    Ok(())
}

/// Run a pipeline intent, abandoning the session on Ctrl-C.
async fn run_cancellable(orchestrator: &mut InstallOrchestrator, intent: Intent) -> InstallerResult<()> {
    let cancel = orchestrator.cancel_handle();
    let watcher: JoinHandle<()> = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = orchestrator.handle(intent).await;
    watcher.abort();

    if result.is_ok() && orchestrator.stage() == &Stage::Init {
        warn!("Install cancelled");
    }
    result.map(|_| ())
}

async fn log_events(mut rx: UnboundedReceiver<InstallerEvent>) {
    while let Some(event) = rx.recv().await {
        let (level, line) = render_event(&event);
        match level {
            LogLevel::Info => info!("{line}"),
            LogLevel::Warn => warn!("{line}"),
            LogLevel::Error => error!("{line}"),
        }
    }
}

/// One human-readable log line per event.
pub fn render_event(event: &InstallerEvent) -> (LogLevel, String) {
    match event {
        InstallerEvent::StageChanged { stage } => (LogLevel::Info, format!("[{stage}]")),
        InstallerEvent::DownloadProgress(p) => {
            let line = if p.total_bytes > 0 {
                format!(
                    "Downloading {}% ({} / {}) at {}, {} left",
                    p.percent,
                    format_bytes(p.bytes_downloaded),
                    format_bytes(p.total_bytes),
                    format_speed(p.speed_bytes_per_sec),
                    format_eta(p.eta_seconds)
                )
            } else {
                format!(
                    "Downloading {} at {}",
                    format_bytes(p.bytes_downloaded),
                    format_speed(p.speed_bytes_per_sec)
                )
            };
            (LogLevel::Info, line)
        }
        InstallerEvent::ExtractProgress(p) => (
            LogLevel::Info,
            format!("Extracting {}% ({} files)", p.percent, p.file_count),
        ),
        InstallerEvent::Log { level, message } => (*level, message.clone()),
        InstallerEvent::Failed { step, message } => {
            (LogLevel::Error, format!("{step} failed: {message}"))
        }
        InstallerEvent::Ready { exe_path } => (
            LogLevel::Info,
            format!("Ready to play: {}", exe_path.display()),
        ),
    }
}

fn status_lines(session: &InstallSession) -> Vec<String> {
    let config = &session.config;
    let mut lines = vec![
        format!(
            "{} {} (config: {})",
            config.installer_name.as_deref().unwrap_or("ExoInstaller"),
            config.installer_version_label(),
            config.origin
        ),
        format!("Game:       {}", config.display_name()),
        format!("Available:  {}", config.game_version),
        format!("Installed:  {}", session.version_state.installed_version),
        format!("Status:     {}", check_label(session.check)),
        format!("Size:       {}", config.required_size_label()),
        format!("Directory:  {}", session.selected_dir.display()),
    ];
    for entry in &config.changelog {
        lines.push(format!("  [{}] {}", entry.tag(), entry.text()));
    }
    lines
}

fn check_label(check: VersionCheck) -> &'static str {
    match check {
        VersionCheck::FirstInstall => "not installed",
        VersionCheck::UpToDate => "up to date",
        VersionCheck::UpdateAvailable => "update available",
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::core::downloader::DownloadProgress;
    use crate::core::orchestrator::Step;
    use crate::core::state::VersionState;

    #[test]
    fn download_line_without_total_omits_percent() {
        let event = InstallerEvent::DownloadProgress(DownloadProgress {
            percent: 0,
            bytes_downloaded: 2048,
            total_bytes: 0,
            speed_bytes_per_sec: 1024,
            eta_seconds: None,
        });
        let (level, line) = render_event(&event);
        assert_eq!(level, LogLevel::Info);
        assert!(line.starts_with("Downloading "));
        assert!(!line.contains('%'));
    }

    #[test]
    fn failure_renders_as_error() {
        let (level, line) = render_event(&InstallerEvent::Failed {
            step: Step::Extract,
            message: "bad archive".into(),
        });
        assert_eq!(level, LogLevel::Error);
        assert_eq!(line, "extract failed: bad archive");
    }

    #[test]
    fn status_includes_versions_and_changelog() {
        let config = serde_json::from_value(serde_json::json!({
            "game_name": "Exo Online",
            "exe_name": "Silkroad.exe",
            "game_version": "1.2.0",
            "client_url": "http://x/Exo.zip",
            "file_size_mb": 2048,
            "changelog": ["Fixed login", { "tag": "new", "text": "Arena" }],
        }))
        .unwrap();
        let session = InstallSession::new(
            config,
            VersionState::new("1.1.0", "/games/Exo"),
            VersionCheck::UpdateAvailable,
            Path::new("/games"),
        );

        let lines = status_lines(&session);
        assert!(lines.contains(&"Status:     update available".to_string()));
        assert!(lines.contains(&"Size:       2.0 GB".to_string()));
        assert!(lines.contains(&"  [new] Arena".to_string()));
        assert!(lines.contains(&"  [update] Fixed login".to_string()));
    }
}

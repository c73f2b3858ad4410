use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};

use super::stage::{Stage, Step};
use crate::core::archive::ExtractProgress;
use crate::core::downloader::DownloadProgress;

/// Actions the presentation layer may request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Proceed from the version-check screen to directory selection.
    Continue,
    SelectDirectory(PathBuf),
    StartInstall,
    /// Re-run the install on an up-to-date game, regardless of version.
    Repair,
    Cancel,
    Launch,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Continue => "continue",
            Intent::SelectDirectory(_) => "select_directory",
            Intent::StartInstall => "start_install",
            Intent::Repair => "repair",
            Intent::Cancel => "cancel",
            Intent::Launch => "launch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Everything the orchestrator reports back to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InstallerEvent {
    StageChanged { stage: Stage },
    DownloadProgress(DownloadProgress),
    ExtractProgress(ExtractProgress),
    Log { level: LogLevel, message: String },
    Failed { step: Step, message: String },
    Ready { exe_path: PathBuf },
}

/// Sending side of the event stream. A closed or absent receiver is a
/// detached observer; sends are then dropped silently.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<InstallerEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<InstallerEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<InstallerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: InstallerEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(InstallerEvent::Log {
            level,
            message: message.into(),
        });
    }
}

/// Lets another task abandon a running install.
///
/// Cancelling detaches the orchestrator from the in-flight transfer; the
/// transfer itself keeps running until it completes or fails on its own.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub(crate) fn reset(&self) {
        self.tx.send_replace(false);
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

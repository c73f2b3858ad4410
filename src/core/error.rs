use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the installer backend.
/// Every module returns `Result<T, InstallerError>`.
#[derive(Debug, Error)]
pub enum InstallerError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create directory {path:?}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Not enough disk space at {path:?}: {available_mb} MB free, {required_mb} MB required")]
    InsufficientDiskSpace {
        path: PathBuf,
        available_mb: u64,
        required_mb: u64,
    },

    // ── Configuration ───────────────────────────────────
    #[error("Configuration unavailable (remote: {remote}; local: {local})")]
    ConfigUnavailable { remote: String, local: String },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadHttp { url: String, status: u16 },

    #[error("Download interrupted for {url}: {detail}")]
    DownloadTransport { url: String, detail: String },

    #[error("Too many redirects for {url} (limit {limit})")]
    TooManyRedirects { url: String, limit: usize },

    #[error("Redirect from {url} has no usable Location header")]
    MissingRedirectLocation { url: String },

    // ── Archive ─────────────────────────────────────────
    #[error("Extraction of {archive:?} failed: {detail}")]
    Extraction { archive: PathBuf, detail: String },

    #[error("Unsupported archive format: {0:?}")]
    UnsupportedArchive(PathBuf),

    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Install ─────────────────────────────────────────
    #[error("Executable {exe_name} not found under {base_dir:?}")]
    ExecutableNotFound { base_dir: PathBuf, exe_name: String },

    #[error("Failed to persist version state to {path:?}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Shortcut creation failed: {0}")]
    Shortcut(String),

    #[error("Failed to launch {path:?}: {detail}")]
    LaunchFailed { path: PathBuf, detail: String },

    // ── Orchestration ───────────────────────────────────
    #[error("Intent {intent} is not valid in stage {stage}")]
    InvalidTransition { stage: String, intent: String },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type InstallerResult<T> = Result<T, InstallerError>;

impl InstallerError {
    /// Errors after which the session cannot continue at all.
    ///
    /// Download and extraction failures are not in this set: the session
    /// returns to directory selection so the user can retry.
    pub fn is_fatal_for_session(&self) -> bool {
        matches!(
            self,
            InstallerError::ConfigUnavailable { .. }
                | InstallerError::DirectoryCreate { .. }
                | InstallerError::Persist { .. }
        )
    }
}

impl From<std::io::Error> for InstallerError {
    fn from(source: std::io::Error) -> Self {
        InstallerError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// ── Serialization for the presentation layer ────────────
// Front-ends receive errors as plain display strings.
impl serde::Serialize for InstallerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

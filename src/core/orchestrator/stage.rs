use serde::Serialize;

use crate::core::state::version_store::NO_VERSION;

/// Outcome of comparing the installed version against the configured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionCheck {
    FirstInstall,
    UpToDate,
    UpdateAvailable,
}

/// Pure comparison of the installed and available version strings.
///
/// Versions are compared for equality only; any difference is an update.
pub fn check_version(installed: &str, available: &str) -> VersionCheck {
    if installed == NO_VERSION {
        VersionCheck::FirstInstall
    } else if installed == available {
        VersionCheck::UpToDate
    } else {
        VersionCheck::UpdateAvailable
    }
}

/// Pipeline step a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Config,
    Directory,
    Download,
    Extract,
    Locate,
    Finalize,
    Launch,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Config => "config",
            Step::Directory => "directory",
            Step::Download => "download",
            Step::Extract => "extract",
            Step::Locate => "locate",
            Step::Finalize => "finalize",
            Step::Launch => "launch",
        };
        f.write_str(name)
    }
}

/// Orchestrator state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    Init,
    ConfigResolved,
    VersionChecked,
    UpToDate,
    UpdateAvailable,
    FirstInstall,
    /// Waiting for the user to confirm or change the install directory.
    SelectingDirectory,
    Downloading,
    Extracting,
    Locating,
    Finalizing,
    Ready,
    Failed { step: Step, detail: String },
}

impl Stage {
    pub fn from_check(check: VersionCheck) -> Self {
        match check {
            VersionCheck::FirstInstall => Stage::FirstInstall,
            VersionCheck::UpToDate => Stage::UpToDate,
            VersionCheck::UpdateAvailable => Stage::UpdateAvailable,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::ConfigResolved => "config_resolved",
            Stage::VersionChecked => "version_checked",
            Stage::UpToDate => "up_to_date",
            Stage::UpdateAvailable => "update_available",
            Stage::FirstInstall => "first_install",
            Stage::SelectingDirectory => "selecting_directory",
            Stage::Downloading => "downloading",
            Stage::Extracting => "extracting",
            Stage::Locating => "locating",
            Stage::Finalizing => "finalizing",
            Stage::Ready => "ready",
            Stage::Failed { .. } => "failed",
        }
    }

    /// Stages in which the pipeline is actively transferring or writing.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            Stage::Downloading | Stage::Extracting | Stage::Locating | Stage::Finalizing
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Failed { step, detail } => write!(f, "failed at {step}: {detail}"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_prior_install_is_first_install() {
        assert_eq!(check_version("0.0.0", "1.2.0"), VersionCheck::FirstInstall);
        assert_eq!(check_version("0.0.0", "0.0.0"), VersionCheck::FirstInstall);
    }

    #[test]
    fn same_version_is_up_to_date() {
        assert_eq!(check_version("1.2.0", "1.2.0"), VersionCheck::UpToDate);
    }

    #[test]
    fn different_version_is_update() {
        assert_eq!(check_version("1.1.0", "1.2.0"), VersionCheck::UpdateAvailable);
        // Downgrades are still offered as updates.
        assert_eq!(check_version("2.0.0", "1.2.0"), VersionCheck::UpdateAvailable);
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::SelectingDirectory.to_string(), "selecting_directory");
        let failed = Stage::Failed {
            step: Step::Download,
            detail: "HTTP 404".into(),
        };
        assert_eq!(failed.to_string(), "failed at download: HTTP 404");
    }
}

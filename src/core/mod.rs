// ─── ExoInstaller Core ───
// Backend of the game-client installer/updater.
//
// Architecture:
//   core/
//     config/       Remote configuration with bundled-file fallback
//     state/        Installer settings + persisted version state
//     downloader/   Streaming archive download with bounded redirects
//     archive/      Zip / 7z extraction
//     install/      Executable search, shortcuts, launch, disk checks
//     orchestrator/ Session state machine driven by intents

pub mod archive;
pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod install;
pub mod orchestrator;
pub mod state;

#[cfg(test)]
mod test_support;

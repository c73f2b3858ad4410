pub mod events;
pub mod machine;
pub mod session;
pub mod stage;

pub use events::{CancelHandle, EventSink, InstallerEvent, Intent, LogLevel};
pub use machine::{InstallOrchestrator, InstallerServices};
pub use session::{default_install_dir, InstallSession};
pub use stage::{check_version, Stage, Step, VersionCheck};

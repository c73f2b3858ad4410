pub mod settings;
pub mod version_store;

pub use settings::{default_data_dir, InstallerSettings};
pub use version_store::{VersionState, VersionStateStore};

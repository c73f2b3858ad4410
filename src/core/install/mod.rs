pub mod disk;
pub mod launch;
pub mod locator;
pub mod naming;
pub mod shortcut;

pub use disk::ensure_disk_space;
pub use launch::{executable_path, launch_game};
pub use locator::{find_executable, ExecutableLocator};
pub use naming::sanitize_file_name;
pub use shortcut::ShortcutManager;

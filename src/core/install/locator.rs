use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::error::{InstallerError, InstallerResult};

/// Finds the game executable inside an extracted tree whose layout is not
/// known in advance.
#[derive(Debug, Clone, Default)]
pub struct ExecutableLocator;

impl ExecutableLocator {
    pub fn new() -> Self {
        Self
    }

    /// Depth-first search of `base_dir` for a file named `target` (ASCII
    /// case-insensitive). `Ok(None)` when the tree holds no match; an error
    /// only when `base_dir` itself cannot be read.
    pub async fn find(&self, base_dir: &Path, target: &str) -> InstallerResult<Option<PathBuf>> {
        let base_dir = base_dir.to_path_buf();
        let target = target.to_string();
        tokio::task::spawn_blocking(move || find_executable(&base_dir, &target))
            .await
            .map_err(|e| InstallerError::Other(format!("Task join error: {e}")))?
    }
}

pub fn find_executable(base_dir: &Path, target: &str) -> InstallerResult<Option<PathBuf>> {
    let entries = sorted_entries(base_dir).map_err(|source| InstallerError::Io {
        path: base_dir.to_path_buf(),
        source,
    })?;

    let found = search(entries, target);
    match &found {
        Some(path) => info!("Found {} at {:?}", target, path),
        None => debug!("{} not present under {:?}", target, base_dir),
    }
    Ok(found)
}

fn search(entries: Vec<std::fs::DirEntry>, target: &str) -> Option<PathBuf> {
    for entry in entries {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            match sorted_entries(&path) {
                Ok(children) => {
                    if let Some(found) = search(children, target) {
                        return Some(found);
                    }
                }
                Err(e) => warn!("Skipping unreadable directory {:?}: {}", path, e),
            }
        } else if (file_type.is_file() || path.is_file())
            && entry.file_name().to_string_lossy().eq_ignore_ascii_case(target)
        {
            return Some(path);
        }
    }
    None
}

/// Directory listing in lexicographic name order, so results do not depend
/// on host enumeration order.
fn sorted_entries(dir: &Path) -> std::io::Result<Vec<std::fs::DirEntry>> {
    let mut entries = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"MZ").unwrap();
    }

    #[tokio::test]
    async fn finds_nested_file_case_insensitively() {
        let root = tempfile::tempdir().unwrap();
        let exe = root.path().join("sub1").join("sub2").join("Target.exe");
        touch(&exe);

        let found = ExecutableLocator::new()
            .find(root.path(), "target.exe")
            .await
            .unwrap();
        assert_eq!(found, Some(exe));
    }

    #[tokio::test]
    async fn no_match_is_not_an_error() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("data").join("other.exe"));

        let found = ExecutableLocator::new()
            .find(root.path(), "target.exe")
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn unreadable_base_dir_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let result = ExecutableLocator::new()
            .find(&root.path().join("does-not-exist"), "target.exe")
            .await;
        assert!(matches!(result, Err(InstallerError::Io { .. })));
    }

    #[test]
    fn traversal_order_is_lexicographic_depth_first() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("b").join("game.exe"));
        touch(&root.path().join("a").join("deep").join("GAME.EXE"));
        touch(&root.path().join("c_game.exe"));

        let found = find_executable(root.path(), "game.exe").unwrap();
        assert_eq!(
            found,
            Some(root.path().join("a").join("deep").join("GAME.EXE"))
        );
    }

    #[test]
    fn directory_with_target_name_is_not_a_match() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("game.exe")).unwrap();
        touch(&root.path().join("z").join("game.exe"));

        let found = find_executable(root.path(), "game.exe").unwrap();
        assert_eq!(found, Some(root.path().join("z").join("game.exe")));
    }
}

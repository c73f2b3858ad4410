use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{InstallerError, InstallerResult};

const MB: u64 = 1024 * 1024;

/// Fail if the volume that will hold `path` has less than `required_mb` free.
///
/// Unknown volumes and `required_mb == 0` pass. Volume enumeration blocks,
/// so it runs on the blocking pool.
pub async fn ensure_disk_space(path: &Path, required_mb: u64) -> InstallerResult<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || check_disk_space(&path, required_mb))
        .await
        .map_err(|e| InstallerError::Other(format!("Task join error: {e}")))?
}

fn check_disk_space(path: &Path, required_mb: u64) -> InstallerResult<()> {
    if required_mb == 0 {
        return Ok(());
    }

    let Some(available) = available_space(path) else {
        debug!("No volume found for {:?}, skipping disk check", path);
        return Ok(());
    };

    let available_mb = available / MB;
    if available_mb < required_mb {
        return Err(InstallerError::InsufficientDiskSpace {
            path: path.to_path_buf(),
            available_mb,
            required_mb,
        });
    }
    Ok(())
}

fn available_space(path: &Path) -> Option<u64> {
    let existing = nearest_existing(path);
    let canonical = std::fs::canonicalize(&existing).unwrap_or(existing);

    let disks = sysinfo::Disks::new_with_refreshed_list();
    let mut best_len = 0usize;
    let mut available = None;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if canonical.starts_with(mount) {
            let len = mount.as_os_str().len();
            if len >= best_len {
                best_len = len;
                available = Some(disk.available_space());
            }
        }
    }
    available
}

/// The install directory usually does not exist yet; measure its closest
/// existing ancestor instead.
fn nearest_existing(path: &Path) -> PathBuf {
    path.ancestors()
        .find(|p| p.exists())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_requirement_always_passes() {
        assert!(ensure_disk_space(Path::new("/definitely/not/here"), 0)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn absurd_requirement_fails_on_known_volume() {
        let dir = tempfile::tempdir().unwrap();
        if available_space(dir.path()).is_none() {
            return;
        }
        let err = ensure_disk_space(&dir.path().join("Games").join("Exo"), u64::MAX / MB)
            .await
            .unwrap_err();
        assert!(matches!(err, InstallerError::InsufficientDiskSpace { .. }));
    }

    #[test]
    fn nearest_existing_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("a").join("b");
        assert_eq!(nearest_existing(&missing), dir.path().to_path_buf());
    }
}

// ─── Archive Extraction ───
// Expands the downloaded client archive into the install directory,
// preserving the archive's internal layout. Zip and 7z are supported.

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::error::{InstallerError, InstallerResult};

const ZIP_MAGIC: &[u8] = b"PK";
const SEVEN_Z_MAGIC: &[u8] = &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];

/// Payload reported while entries are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractProgress {
    pub percent: u8,
    /// Entries processed so far.
    pub file_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    SevenZ,
}

/// State of a single extraction run.
#[derive(Debug, Clone)]
pub struct ExtractionTask {
    pub archive: PathBuf,
    pub dest_dir: PathBuf,
    pub percent: u8,
    total_entries: usize,
    done_entries: usize,
}

impl ExtractionTask {
    fn new(archive: &Path, dest_dir: &Path) -> Self {
        Self {
            archive: archive.to_path_buf(),
            dest_dir: dest_dir.to_path_buf(),
            percent: 0,
            total_entries: 0,
            done_entries: 0,
        }
    }

    fn entry_done(&mut self) -> ExtractProgress {
        self.done_entries += 1;
        self.percent = if self.total_entries == 0 {
            100
        } else {
            (self.done_entries * 100 / self.total_entries).min(100) as u8
        };
        ExtractProgress {
            percent: self.percent,
            file_count: self.done_entries,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract every entry of `archive` under `dest_dir`.
    ///
    /// Runs on the blocking pool; `on_progress` is called from that thread.
    /// On failure, files already written are left in place and must be
    /// treated as incomplete.
    pub async fn extract<F>(
        &self,
        archive: &Path,
        dest_dir: &Path,
        on_progress: F,
    ) -> InstallerResult<()>
    where
        F: FnMut(ExtractProgress) + Send + 'static,
    {
        let archive = archive.to_path_buf();
        let dest_dir = dest_dir.to_path_buf();
        info!("Extracting {:?} to {:?}", archive, dest_dir);

        let archive_for_task = archive.clone();
        let result = tokio::task::spawn_blocking(move || {
            extract_blocking(&archive_for_task, &dest_dir, on_progress)
        })
        .await
        .map_err(|e| InstallerError::Extraction {
            archive: archive.clone(),
            detail: format!("extraction task failed: {e}"),
        })?;

        match result {
            Ok(count) => {
                info!("Extraction complete: {} entries", count);
                Ok(())
            }
            Err(e @ InstallerError::Extraction { .. }) => Err(e),
            Err(e @ InstallerError::UnsupportedArchive(_)) => Err(e),
            Err(e) => {
                warn!("Extraction error: {}", e);
                Err(InstallerError::Extraction {
                    archive,
                    detail: e.to_string(),
                })
            }
        }
    }
}

fn extract_blocking<F>(archive: &Path, dest_dir: &Path, mut on_progress: F) -> InstallerResult<usize>
where
    F: FnMut(ExtractProgress),
{
    std::fs::create_dir_all(dest_dir).map_err(|source| InstallerError::Io {
        path: dest_dir.to_path_buf(),
        source,
    })?;

    let mut task = ExtractionTask::new(archive, dest_dir);
    match detect_kind(archive)? {
        ArchiveKind::Zip => extract_zip(&mut task, &mut on_progress)?,
        ArchiveKind::SevenZ => extract_7z(&mut task, &mut on_progress)?,
    }
    Ok(task.done_entries)
}

/// Identify the archive format by magic bytes, then by extension.
pub fn detect_kind(path: &Path) -> InstallerResult<ArchiveKind> {
    let mut header = [0u8; 6];
    let read = File::open(path)
        .and_then(|mut file| file.read(&mut header))
        .map_err(|source| InstallerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let header = &header[..read];

    if header.starts_with(SEVEN_Z_MAGIC) {
        return Ok(ArchiveKind::SevenZ);
    }
    if header.starts_with(ZIP_MAGIC) {
        return Ok(ArchiveKind::Zip);
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("zip") => Ok(ArchiveKind::Zip),
        Some("7z") => Ok(ArchiveKind::SevenZ),
        _ => Err(InstallerError::UnsupportedArchive(path.to_path_buf())),
    }
}

fn extract_zip<F>(task: &mut ExtractionTask, on_progress: &mut F) -> InstallerResult<()>
where
    F: FnMut(ExtractProgress),
{
    let zip_file = File::open(&task.archive).map_err(|source| InstallerError::Io {
        path: task.archive.clone(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(zip_file)?;
    task.total_entries = archive.len();

    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;
        let rel_path = zipped
            .enclosed_name()
            .ok_or_else(|| InstallerError::Extraction {
                archive: task.archive.clone(),
                detail: format!("entry escapes destination: {}", zipped.name()),
            })?;
        let out_path = task.dest_dir.join(rel_path);

        if zipped.is_dir() {
            create_dir(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                create_dir(parent)?;
            }
            let mut out = File::create(&out_path).map_err(|source| InstallerError::Io {
                path: out_path.clone(),
                source,
            })?;
            std::io::copy(&mut zipped, &mut out).map_err(|source| InstallerError::Io {
                path: out_path.clone(),
                source,
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = zipped.unix_mode() {
                    let _ = std::fs::set_permissions(
                        &out_path,
                        std::fs::Permissions::from_mode(mode),
                    );
                }
            }
        }

        debug!("Extracted {:?}", out_path);
        on_progress(task.entry_done());
    }

    Ok(())
}

fn extract_7z<F>(task: &mut ExtractionTask, on_progress: &mut F) -> InstallerResult<()>
where
    F: FnMut(ExtractProgress),
{
    let mut reader =
        sevenz_rust::SevenZReader::open(&task.archive, sevenz_rust::Password::empty()).map_err(
            |e| InstallerError::Extraction {
                archive: task.archive.clone(),
                detail: e.to_string(),
            },
        )?;
    task.total_entries = reader.archive().files.len();

    // Errors from our side stop the walk and are reported after it returns.
    let mut write_error: Option<InstallerError> = None;
    let archive_path = task.archive.clone();

    let walk = reader.for_each_entries(|entry, data| {
        // Stopping only ends the current block; later blocks still call in.
        if write_error.is_some() {
            return Ok(false);
        }
        let written = write_7z_entry(task, entry.name(), entry.is_directory(), data);
        match written {
            Ok(()) => {
                on_progress(task.entry_done());
                Ok(true)
            }
            Err(e) => {
                write_error = Some(e);
                Ok(false)
            }
        }
    });

    if let Some(e) = write_error {
        return Err(e);
    }
    walk.map_err(|e| InstallerError::Extraction {
        archive: archive_path,
        detail: e.to_string(),
    })
}

fn write_7z_entry(
    task: &ExtractionTask,
    name: &str,
    is_directory: bool,
    data: &mut dyn Read,
) -> InstallerResult<()> {
    let rel_path = sanitize_entry_path(name).ok_or_else(|| InstallerError::Extraction {
        archive: task.archive.clone(),
        detail: format!("entry escapes destination: {name}"),
    })?;
    let out_path = task.dest_dir.join(rel_path);

    if is_directory {
        return create_dir(&out_path);
    }

    if let Some(parent) = out_path.parent() {
        create_dir(parent)?;
    }
    let mut out = File::create(&out_path).map_err(|source| InstallerError::Io {
        path: out_path.clone(),
        source,
    })?;
    std::io::copy(data, &mut out).map_err(|source| InstallerError::Io {
        path: out_path.clone(),
        source,
    })?;
    debug!("Extracted {:?}", out_path);
    Ok(())
}

/// Relative path for an archive entry name, or `None` if it would leave the
/// destination directory.
fn sanitize_entry_path(name: &str) -> Option<PathBuf> {
    let normalized = name.replace('\\', "/");
    let mut rel_path = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => rel_path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if rel_path.as_os_str().is_empty() {
        None
    } else {
        Some(rel_path)
    }
}

fn create_dir(path: &Path) -> InstallerResult<()> {
    std::fs::create_dir_all(path).map_err(|source| InstallerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

//! [`FileSystem`] implementation backed by the operating system
//!
//! Each operation runs its blocking syscalls on tokio's blocking pool, so the
//! sync task never pins a runtime worker while waiting on the disk.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use filetime::FileTime;
use fs2::FileExt;

use crate::{DirEntry, EntryKind, Error, FileMetadata, FileSystem, Result};

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

/// Run `op` on the blocking pool, attributing failures to `path`.
async fn blocking<T, F>(path: &Path, op: F) -> Result<T>
where
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| Error::TaskFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .map_err(|e| Error::io(path, e))
}

fn kind_of(file_type: fs::FileType, metadata: &fs::Metadata) -> EntryKind {
    if file_type.is_symlink() || is_reparse_point(metadata) {
        EntryKind::Link
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}

#[cfg(windows)]
fn is_reparse_point(metadata: &fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x400;
    metadata.file_attributes() & FILE_ATTRIBUTE_REPARSE_POINT != 0
}

#[cfg(not(windows))]
fn is_reparse_point(_metadata: &fs::Metadata) -> bool {
    false
}

fn list_dir(path: &Path) -> std::io::Result<Vec<Result<DirEntry>>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let child = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                entries.push(Err(Error::io(path, e)));
                continue;
            }
        };
        match fs::symlink_metadata(&child) {
            Ok(metadata) => {
                let kind = kind_of(metadata.file_type(), &metadata);
                entries.push(Ok(DirEntry::new(child, kind)));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %child.display(), "Entry vanished while listing");
            }
            Err(e) => entries.push(Err(Error::io(child, e))),
        }
    }
    entries.sort_by(|a, b| listed_path(a).cmp(listed_path(b)));
    Ok(entries)
}

fn listed_path(entry: &Result<DirEntry>) -> &Path {
    match entry {
        Ok(entry) => entry.path.as_path(),
        Err(e) => e.path(),
    }
}

fn stream_into(from: &Path, to: &Path) -> std::io::Result<u64> {
    let mut reader = File::open(from)?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(to)?;

    // Nobody else may open the temp file while it is being filled
    FileExt::lock_exclusive(&writer)?;
    let bytes = std::io::copy(&mut reader, &mut writer)?;
    writer.sync_all()?;
    FileExt::unlock(&writer)?;

    Ok(bytes)
}

fn make_writable(path: &Path) -> std::io::Result<bool> {
    let mut permissions = fs::symlink_metadata(path)?.permissions();
    if !permissions.readonly() {
        return Ok(false);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o200);
    }
    #[cfg(not(unix))]
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(false);

    fs::set_permissions(path, permissions)?;
    Ok(true)
}

fn replace_keeping_permissions(from: &Path, to: &Path) -> std::io::Result<()> {
    let permissions = fs::metadata(to)?.permissions();
    if !permissions.readonly() {
        fs::set_permissions(from, permissions)?;
        return fs::rename(from, to);
    }

    // Windows refuses to replace a read-only file, so the flag is lifted for
    // the rename and put back on the new file
    make_writable(to)?;
    if let Err(e) = fs::rename(from, to) {
        let _ = fs::set_permissions(to, permissions);
        return Err(e);
    }
    fs::set_permissions(to, permissions)
}

#[async_trait]
impl FileSystem for OsFileSystem {
    async fn entry_kind(&self, path: &Path) -> Result<Option<EntryKind>> {
        let target = path.to_path_buf();
        blocking(path, move || match fs::symlink_metadata(&target) {
            Ok(metadata) => Ok(Some(kind_of(metadata.file_type(), &metadata))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<Result<DirEntry>>> {
        let target = path.to_path_buf();
        blocking(path, move || list_dir(&target)).await
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let target = path.to_path_buf();
        blocking(path, move || {
            let metadata = fs::symlink_metadata(&target)?;
            let modified = DateTime::<Utc>::from(metadata.modified()?);
            Ok(FileMetadata::new(metadata.len(), modified))
        })
        .await
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        let target = path.to_path_buf();
        blocking(path, move || fs::create_dir_all(&target)).await
    }

    async fn copy_contents(&self, from: &Path, to: &Path) -> Result<u64> {
        let (source, destination) = (from.to_path_buf(), to.to_path_buf());
        blocking(to, move || stream_into(&source, &destination)).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let (source, destination) = (from.to_path_buf(), to.to_path_buf());
        blocking(to, move || fs::rename(&source, &destination)).await
    }

    async fn replace(&self, from: &Path, to: &Path) -> Result<()> {
        let (source, destination) = (from.to_path_buf(), to.to_path_buf());
        blocking(to, move || replace_keeping_permissions(&source, &destination)).await
    }

    async fn set_modified(&self, path: &Path, modified: DateTime<Utc>) -> Result<()> {
        let target = path.to_path_buf();
        let mtime = FileTime::from_system_time(modified.into());
        blocking(path, move || filetime::set_file_mtime(&target, mtime)).await
    }

    async fn clear_readonly(&self, path: &Path) -> Result<bool> {
        let target = path.to_path_buf();
        blocking(path, move || make_writable(&target)).await
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        let target = path.to_path_buf();
        blocking(path, move || fs::remove_file(&target)).await
    }

    async fn remove_dir(&self, path: &Path) -> Result<()> {
        let target = path.to_path_buf();
        blocking(path, move || fs::remove_dir(&target)).await
    }

    async fn is_dir_empty(&self, path: &Path) -> Result<bool> {
        let target = path.to_path_buf();
        blocking(path, move || Ok(fs::read_dir(&target)?.next().is_none())).await
    }
}

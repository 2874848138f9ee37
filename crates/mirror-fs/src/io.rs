//! Atomic file transfer on top of a [`FileSystem`]

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::{EntryKind, FileSystem, Result};

/// Suffix marking in-flight temporary files.
pub const TEMP_SUFFIX: &str = "mirror-tmp";

/// Unique temporary sibling for `destination`.
///
/// Lives in the same directory so the final rename never crosses filesystems.
pub fn temp_sibling(destination: &Path) -> PathBuf {
    let temp_name = format!(
        ".{}.{}.{}",
        destination
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        uuid::Uuid::new_v4().simple(),
        TEMP_SUFFIX
    );
    destination.with_file_name(temp_name)
}

/// Copy `source` to `destination` so that readers only ever observe the old
/// complete file or the new complete file.
///
/// Uses a write-to-temp-then-rename strategy: the bytes are streamed into a
/// temporary sibling, stamped with `modified`, and then published by replacing
/// the existing destination (keeping its permissions) or moving the temp file
/// into place. On failure the temporary file is removed and the destination is
/// left untouched.
pub async fn copy_atomic<F>(
    fs: &F,
    source: &Path,
    destination: &Path,
    modified: DateTime<Utc>,
) -> Result<u64>
where
    F: FileSystem + ?Sized,
{
    // Ensure parent directory exists
    if let Some(parent) = destination.parent() {
        fs.create_dir_all(parent).await?;
    }

    let temp_path = temp_sibling(destination);

    match publish(fs, source, &temp_path, destination, modified).await {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            if let Ok(Some(_)) = fs.entry_kind(&temp_path).await
                && let Err(cleanup) = fs.remove_file(&temp_path).await
            {
                tracing::debug!(
                    path = %temp_path.display(),
                    error = %cleanup,
                    "Failed to remove temporary file"
                );
            }
            Err(e)
        }
    }
}

async fn publish<F>(
    fs: &F,
    source: &Path,
    temp_path: &Path,
    destination: &Path,
    modified: DateTime<Utc>,
) -> Result<u64>
where
    F: FileSystem + ?Sized,
{
    let bytes = fs.copy_contents(source, temp_path).await?;
    fs.set_modified(temp_path, modified).await?;

    match fs.entry_kind(destination).await? {
        Some(EntryKind::File) => fs.replace(temp_path, destination).await?,
        _ => fs.rename(temp_path, destination).await?,
    }

    Ok(bytes)
}

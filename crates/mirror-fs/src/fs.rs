//! The filesystem capability interface the sync engine is written against

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{DirEntry, EntryKind, FileMetadata, Result};

/// Narrow set of filesystem operations needed to scan, copy and delete.
///
/// Every failure is reported as a [`crate::Error`] whose
/// [`kind`](crate::Error::kind) tells callers whether it is benign. None of the
/// operations follow symbolic links when inspecting an entry's kind.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Kind of the entry at `path`, or `None` if nothing exists there.
    async fn entry_kind(&self, path: &Path) -> Result<Option<EntryKind>>;

    /// List the direct children of a directory, sorted by name.
    ///
    /// The outer error means the directory itself could not be listed. A
    /// child that could not be inspected is reported in place as its own
    /// error, so one bad entry never hides its siblings. Children that vanish
    /// while the directory is being listed are left out.
    async fn read_dir(&self, path: &Path) -> Result<Vec<Result<DirEntry>>>;

    /// Size and modification time of a regular file.
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and any missing ancestors.
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Stream the contents of `from` into `to`, creating or truncating `to`.
    ///
    /// Returns the number of bytes written.
    async fn copy_contents(&self, from: &Path, to: &Path) -> Result<u64>;

    /// Move `from` to `to`, where `to` is not expected to exist.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Atomically replace the existing file `to` with `from`, keeping the
    /// permissions of the file being replaced.
    async fn replace(&self, from: &Path, to: &Path) -> Result<()>;

    async fn set_modified(&self, path: &Path, modified: DateTime<Utc>) -> Result<()>;

    /// Make the entry writable. Returns `true` if a read-only flag was cleared.
    async fn clear_readonly(&self, path: &Path) -> Result<bool>;

    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Remove an empty directory. Fails if the directory has children.
    async fn remove_dir(&self, path: &Path) -> Result<()>;

    async fn is_dir_empty(&self, path: &Path) -> Result<bool>;
}

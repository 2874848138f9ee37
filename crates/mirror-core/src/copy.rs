//! Directory creation and file transfer into the replica

use std::path::Path;
use std::sync::Arc;

use mirror_fs::{EntryKind, FileSystem, RelativePath, copy_atomic};
use tokio_util::sync::CancellationToken;

use crate::error::{ensure_active, skip_or_fail};
use crate::{DiffResult, DirectorySnapshot, Result};

/// Work done by one [`CopyApplier::apply`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub dirs_created: u64,
    pub files_copied: u64,
    pub files_updated: u64,
}

/// Applies the create-directory, copy and update parts of a [`DiffResult`].
///
/// Every unit is attempted on its own: a benign failure skips that unit and
/// the rest still run.
#[derive(Clone)]
pub struct CopyApplier {
    fs: Arc<dyn FileSystem>,
}

impl CopyApplier {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Create missing directories, then copy new files, then update changed
    /// ones. Transferred files get the modification time recorded in `source`.
    pub async fn apply(
        &self,
        source: &DirectorySnapshot,
        replica_root: &Path,
        diff: &DiffResult,
        cancel: &CancellationToken,
    ) -> Result<CopyStats> {
        let mut stats = CopyStats::default();

        // Sorted order puts every parent before its children
        for rel in &diff.dirs_to_create {
            ensure_active(cancel)?;
            if self.create_dir(replica_root, rel).await? {
                stats.dirs_created += 1;
            }
        }

        for rel in &diff.files_to_copy {
            ensure_active(cancel)?;
            if self.transfer(source, replica_root, rel, "copy file").await? {
                stats.files_copied += 1;
            }
        }

        for rel in &diff.files_to_update {
            ensure_active(cancel)?;
            if self.transfer(source, replica_root, rel, "update file").await? {
                stats.files_updated += 1;
            }
        }

        Ok(stats)
    }

    /// Returns `true` only if a directory was actually created.
    async fn create_dir(&self, replica_root: &Path, rel: &RelativePath) -> Result<bool> {
        let target = rel.to_native(replica_root);

        match self.fs.entry_kind(&target).await {
            Ok(Some(EntryKind::Directory)) => return Ok(false),
            Ok(_) => {}
            Err(e) => {
                skip_or_fail("inspect directory", e)?;
                return Ok(false);
            }
        }

        match self.fs.create_dir_all(&target).await {
            Ok(()) => {
                tracing::debug!(path = %rel, "Created directory");
                Ok(true)
            }
            Err(e) => {
                skip_or_fail("create directory", e)?;
                Ok(false)
            }
        }
    }

    async fn transfer(
        &self,
        source: &DirectorySnapshot,
        replica_root: &Path,
        rel: &RelativePath,
        action: &str,
    ) -> Result<bool> {
        let Some(metadata) = source.files.get(rel) else {
            tracing::debug!(path = %rel, "No source metadata, skipping {action}");
            return Ok(false);
        };

        let from = rel.to_native(&source.root);
        let to = rel.to_native(replica_root);

        match copy_atomic(self.fs.as_ref(), &from, &to, metadata.modified).await {
            Ok(bytes) => {
                tracing::debug!(path = %rel, bytes, "Finished {action}");
                Ok(true)
            }
            Err(e) => {
                skip_or_fail(action, e)?;
                Ok(false)
            }
        }
    }
}

//! Removal of stale replica entries

use std::cmp::Reverse;
use std::path::Path;
use std::sync::Arc;

use mirror_fs::{EntryKind, FileSystem, RelativePath};
use tokio_util::sync::CancellationToken;

use crate::error::{ensure_active, skip_or_fail};
use crate::{DiffResult, Result};

/// Work done by one [`DeletionApplier::apply`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionStats {
    pub files_deleted: u64,
    pub dirs_deleted: u64,
}

/// Applies the delete parts of a [`DiffResult`].
///
/// Files go first. Directories are removed deepest first and only when they
/// are empty, so anything the replica gained since the scan is never removed
/// along with its parent.
#[derive(Clone)]
pub struct DeletionApplier {
    fs: Arc<dyn FileSystem>,
}

impl DeletionApplier {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub async fn apply(
        &self,
        replica_root: &Path,
        diff: &DiffResult,
        cancel: &CancellationToken,
    ) -> Result<DeletionStats> {
        let mut stats = DeletionStats::default();

        for rel in &diff.files_to_delete {
            ensure_active(cancel)?;
            if self.delete_file(replica_root, rel).await? {
                stats.files_deleted += 1;
            }
        }

        for rel in deletion_order(&diff.dirs_to_delete) {
            ensure_active(cancel)?;
            if self.delete_dir(replica_root, rel).await? {
                stats.dirs_deleted += 1;
            }
        }

        Ok(stats)
    }

    async fn delete_file(&self, replica_root: &Path, rel: &RelativePath) -> Result<bool> {
        let target = rel.to_native(replica_root);

        match self.fs.entry_kind(&target).await {
            Ok(Some(EntryKind::File)) => {}
            Ok(_) => {
                tracing::debug!(path = %rel, "File already gone, nothing to delete");
                return Ok(false);
            }
            Err(e) => {
                skip_or_fail("inspect file", e)?;
                return Ok(false);
            }
        }

        let removed = match self.fs.clear_readonly(&target).await {
            Ok(_) => self.fs.remove_file(&target).await,
            Err(e) => Err(e),
        };

        match removed {
            Ok(()) => {
                tracing::debug!(path = %rel, "Deleted file");
                Ok(true)
            }
            Err(e) => {
                skip_or_fail("delete file", e)?;
                Ok(false)
            }
        }
    }

    async fn delete_dir(&self, replica_root: &Path, rel: &RelativePath) -> Result<bool> {
        let target = rel.to_native(replica_root);

        let empty = match self.fs.entry_kind(&target).await {
            Ok(Some(EntryKind::Directory)) => self.fs.is_dir_empty(&target).await,
            Ok(_) => {
                tracing::debug!(path = %rel, "Directory already gone, nothing to delete");
                return Ok(false);
            }
            Err(e) => Err(e),
        };

        match empty {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(path = %rel, "Directory not empty, leaving it in place");
                return Ok(false);
            }
            Err(e) => {
                skip_or_fail("inspect directory", e)?;
                return Ok(false);
            }
        }

        let removed = match self.fs.clear_readonly(&target).await {
            Ok(_) => self.fs.remove_dir(&target).await,
            Err(e) => Err(e),
        };

        match removed {
            Ok(()) => {
                tracing::debug!(path = %rel, "Deleted directory");
                Ok(true)
            }
            Err(e) => {
                skip_or_fail("delete directory", e)?;
                Ok(false)
            }
        }
    }
}

/// Deepest paths first; ties broken by path so runs are reproducible.
fn deletion_order<'a>(
    dirs: impl IntoIterator<Item = &'a RelativePath>,
) -> Vec<&'a RelativePath> {
    let mut ordered: Vec<_> = dirs.into_iter().collect();
    ordered.sort_by_key(|rel| (Reverse(rel.depth()), *rel));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use mirror_fs::{MemoryFileSystem, Operation};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use std::io;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 3, 3, 0, 0).unwrap()
    }

    fn set(paths: &[&str]) -> BTreeSet<RelativePath> {
        paths.iter().map(|p| RelativePath::new(p)).collect()
    }

    fn diff(files: &[&str], dirs: &[&str]) -> DiffResult {
        DiffResult {
            files_to_delete: set(files),
            dirs_to_delete: set(dirs),
            ..DiffResult::default()
        }
    }

    #[test]
    fn deepest_directories_come_first() {
        let dirs = set(&["a", "a/b", "a/b/c", "z", "m/n"]);

        let order: Vec<_> = deletion_order(&dirs).into_iter().map(RelativePath::as_str).collect();

        assert_eq!(order, vec!["a/b/c", "a/b", "m/n", "a", "z"]);
    }

    #[tokio::test]
    async fn nested_directories_are_all_removed() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_dir("/dst/a/b/c");

        let stats = DeletionApplier::new(fs.clone())
            .apply(
                Path::new("/dst"),
                &diff(&[], &["a", "a/b", "a/b/c"]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(stats.dirs_deleted, 3);
        assert_eq!(fs.paths(), vec![Path::new("/dst").to_path_buf()]);
    }

    #[tokio::test]
    async fn files_are_deleted_before_their_directory() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/dst/old/x.txt", "x", t0());

        let stats = DeletionApplier::new(fs.clone())
            .apply(
                Path::new("/dst"),
                &diff(&["old/x.txt"], &["old"]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            stats,
            DeletionStats {
                files_deleted: 1,
                dirs_deleted: 1
            }
        );
        assert!(!fs.exists("/dst/old"));
    }

    #[tokio::test]
    async fn non_empty_directory_is_kept() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/dst/keep/newcomer.txt", "n", t0());

        let stats = DeletionApplier::new(fs.clone())
            .apply(Path::new("/dst"), &diff(&[], &["keep"]), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stats.dirs_deleted, 0);
        assert!(fs.is_file("/dst/keep/newcomer.txt"));
    }

    #[tokio::test]
    async fn readonly_entries_are_cleared_then_removed() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/dst/ro/locked.txt", "l", t0());
        fs.set_readonly("/dst/ro/locked.txt", true);
        fs.set_readonly("/dst/ro", true);

        let stats = DeletionApplier::new(fs.clone())
            .apply(
                Path::new("/dst"),
                &diff(&["ro/locked.txt"], &["ro"]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(stats.files_deleted, 1);
        assert_eq!(stats.dirs_deleted, 1);
    }

    #[tokio::test]
    async fn vanished_entries_are_not_counted() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_dir("/dst");

        let stats = DeletionApplier::new(fs.clone())
            .apply(
                Path::new("/dst"),
                &diff(&["gone.txt"], &["gone"]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(stats, DeletionStats::default());
    }

    #[tokio::test]
    async fn benign_failure_skips_only_that_file() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/dst/a.txt", "a", t0());
        fs.add_file("/dst/b.txt", "b", t0());
        fs.inject_fault(Operation::RemoveFile, "/dst/a.txt", io::ErrorKind::PermissionDenied);

        let stats = DeletionApplier::new(fs.clone())
            .apply(
                Path::new("/dst"),
                &diff(&["a.txt", "b.txt"], &[]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(stats.files_deleted, 1);
        assert!(fs.exists("/dst/a.txt"));
        assert!(!fs.exists("/dst/b.txt"));
    }

    #[tokio::test]
    async fn cancellation_stops_before_next_unit() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/dst/a.txt", "a", t0());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = DeletionApplier::new(fs.clone())
            .apply(Path::new("/dst"), &diff(&["a.txt"], &[]), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(fs.exists("/dst/a.txt"));
    }
}

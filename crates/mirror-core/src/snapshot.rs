//! Point-in-time metadata index of a directory tree

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mirror_fs::{EntryKind, ErrorKind, FileMetadata, FileSystem, RelativePath};
use tokio_util::sync::CancellationToken;

use crate::error::{ensure_active, skip_or_fail};
use crate::{Error, Result};

/// Files and directories found under a root, keyed by relative path.
///
/// The root itself is recorded as the empty path in `directories`. Symbolic
/// links and reparse points never appear in either collection.
#[derive(Debug, Clone)]
pub struct DirectorySnapshot {
    pub root: PathBuf,
    pub files: BTreeMap<RelativePath, FileMetadata>,
    pub directories: BTreeSet<RelativePath>,
    pub created_at: DateTime<Utc>,
}

impl DirectorySnapshot {
    /// An empty snapshot containing only the root directory.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: BTreeMap::new(),
            directories: BTreeSet::from([RelativePath::root()]),
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for DirectorySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Snapshot(root={}, files={}, dirs={})",
            self.root.display(),
            self.files.len(),
            self.directories.len()
        )
    }
}

/// Walks a directory tree and records file metadata.
///
/// Traversal uses an explicit stack, so deep trees cannot exhaust the call
/// stack. Links are never followed.
#[derive(Clone)]
pub struct SnapshotBuilder {
    fs: Arc<dyn FileSystem>,
}

impl SnapshotBuilder {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Build a snapshot of the tree under `root`.
    ///
    /// # Errors
    ///
    /// - [`Error::RootNotFound`] if `root` does not exist or is not a directory
    /// - [`Error::Cancelled`] if `cancel` fires before the walk completes
    /// - [`Error::Fs`] for a failure whose kind is not benign
    ///
    /// Benign failures on individual entries are logged and the entry (or the
    /// subtree below it) is left out.
    pub async fn build(&self, root: &Path, cancel: &CancellationToken) -> Result<DirectorySnapshot> {
        ensure_active(cancel)?;
        self.check_root(root).await?;

        let mut snapshot = DirectorySnapshot::empty(root);
        let mut stack = vec![(root.to_path_buf(), RelativePath::root())];

        while let Some((dir, dir_rel)) = stack.pop() {
            ensure_active(cancel)?;

            let entries = match self.fs.read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    skip_or_fail("scan directory", e)?;
                    continue;
                }
            };

            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        skip_or_fail("inspect entry", e)?;
                        continue;
                    }
                };
                let name = entry.name();
                if !is_portable_name(&name) {
                    tracing::warn!(path = %entry.path.display(), "Skipping entry with unsupported name");
                    continue;
                }
                let rel = dir_rel.join(&name);

                match entry.kind {
                    EntryKind::Directory => {
                        snapshot.directories.insert(rel.clone());
                        stack.push((entry.path, rel));
                    }
                    EntryKind::File => match self.fs.metadata(&entry.path).await {
                        Ok(metadata) => {
                            snapshot.files.insert(rel, metadata);
                        }
                        Err(e) => skip_or_fail("read file metadata", e)?,
                    },
                    EntryKind::Link => {
                        tracing::debug!(path = %entry.path.display(), "Skipping link");
                    }
                    EntryKind::Other => {
                        tracing::debug!(path = %entry.path.display(), "Skipping special file");
                    }
                }
            }
        }

        snapshot.created_at = Utc::now();
        tracing::debug!("{snapshot}");
        Ok(snapshot)
    }

    async fn check_root(&self, root: &Path) -> Result<()> {
        match self.fs.entry_kind(root).await {
            Ok(Some(EntryKind::Directory | EntryKind::Link)) => Ok(()),
            Ok(_) => Err(Error::root_not_found(root)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::root_not_found(root)),
            Err(e) => Err(e.into()),
        }
    }
}

/// Names that survive the round trip through a forward-slash relative path.
fn is_portable_name(name: &str) -> bool {
    cfg!(windows) || !name.contains('\\')
}

//! Set difference between two snapshots

use std::collections::BTreeSet;

use chrono::TimeDelta;
use mirror_fs::{FileMetadata, RelativePath};

use crate::DirectorySnapshot;

/// Largest modification-time skew, in seconds, under which two files of equal
/// size are still considered the same.
///
/// Covers filesystems with coarse timestamp resolution (FAT stores 2 s).
pub const MTIME_TOLERANCE_SECS: i64 = 2;

/// Operations that turn the replica into the source.
///
/// A path appears in at most one of the three file sets, and neither
/// directory set ever contains the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub dirs_to_create: BTreeSet<RelativePath>,
    pub dirs_to_delete: BTreeSet<RelativePath>,
    pub files_to_copy: BTreeSet<RelativePath>,
    pub files_to_update: BTreeSet<RelativePath>,
    pub files_to_delete: BTreeSet<RelativePath>,
}

impl DiffResult {
    /// `true` when the replica already matches the source.
    pub fn is_empty(&self) -> bool {
        self.dirs_to_create.is_empty()
            && self.dirs_to_delete.is_empty()
            && self.files_to_copy.is_empty()
            && self.files_to_update.is_empty()
            && self.files_to_delete.is_empty()
    }
}

/// Same-file test: equal sizes and modification times within
/// [`MTIME_TOLERANCE_SECS`] of each other.
pub fn is_same_file(source: &FileMetadata, replica: &FileMetadata) -> bool {
    let skew = (source.modified - replica.modified).abs();
    source.size == replica.size && skew <= TimeDelta::seconds(MTIME_TOLERANCE_SECS)
}

/// Computes [`DiffResult`]s. Pure; never touches the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffEngine;

impl DiffEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn compute(&self, source: &DirectorySnapshot, replica: &DirectorySnapshot) -> DiffResult {
        let dirs_to_create = source
            .directories
            .difference(&replica.directories)
            .filter(|p| !p.is_root())
            .cloned()
            .collect();

        let dirs_to_delete = replica
            .directories
            .difference(&source.directories)
            .filter(|p| !p.is_root())
            .cloned()
            .collect();

        let mut files_to_copy = BTreeSet::new();
        let mut files_to_update = BTreeSet::new();
        for (path, metadata) in &source.files {
            match replica.files.get(path) {
                None => {
                    files_to_copy.insert(path.clone());
                }
                Some(existing) if !is_same_file(metadata, existing) => {
                    files_to_update.insert(path.clone());
                }
                Some(_) => {}
            }
        }

        let files_to_delete = replica
            .files
            .keys()
            .filter(|p| !source.files.contains_key(*p))
            .cloned()
            .collect();

        let diff = DiffResult {
            dirs_to_create,
            dirs_to_delete,
            files_to_copy,
            files_to_update,
            files_to_delete,
        };

        tracing::info!(
            dirs_to_create = diff.dirs_to_create.len(),
            dirs_to_delete = diff.dirs_to_delete.len(),
            files_to_copy = diff.files_to_copy.len(),
            files_to_update = diff.files_to_update.len(),
            files_to_delete = diff.files_to_delete.len(),
            "Diff computed"
        );

        diff
    }
}

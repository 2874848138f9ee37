//! One full sync cycle: scan, diff, copy, delete

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use mirror_fs::{EntryKind, FileSystem};
use tokio_util::sync::CancellationToken;

use crate::sync_loop::Phase;
use crate::{CopyApplier, CycleSummary, DeletionApplier, DiffEngine, Result, SnapshotBuilder};

/// Runs single mirror cycles against a [`FileSystem`].
///
/// Holds no state between cycles; every run rescans both trees.
#[derive(Clone)]
pub struct SyncRunner {
    fs: Arc<dyn FileSystem>,
    snapshots: SnapshotBuilder,
    diff: DiffEngine,
    copier: CopyApplier,
    deleter: DeletionApplier,
}

impl SyncRunner {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            snapshots: SnapshotBuilder::new(fs.clone()),
            diff: DiffEngine::new(),
            copier: CopyApplier::new(fs.clone()),
            deleter: DeletionApplier::new(fs.clone()),
            fs,
        }
    }

    /// Make `replica` an exact copy of `source`.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::RootNotFound`] if `source` is missing
    /// - [`crate::Error::Cancelled`] if `cancel` fires mid-cycle
    /// - [`crate::Error::Fs`] for a non-benign filesystem failure
    pub async fn run_once(
        &self,
        source: &Path,
        replica: &Path,
        cancel: &CancellationToken,
    ) -> Result<CycleSummary> {
        let started_at = Utc::now();

        Phase::Scanning.enter();
        let source_snapshot = self.snapshots.build(source, cancel).await?;
        self.ensure_replica_root(replica).await?;
        let replica_snapshot = self.snapshots.build(replica, cancel).await?;

        Phase::Diffing.enter();
        let diff = self.diff.compute(&source_snapshot, &replica_snapshot);

        Phase::Copying.enter();
        let copy = self
            .copier
            .apply(&source_snapshot, replica, &diff, cancel)
            .await?;

        Phase::Deleting.enter();
        let deletion = self.deleter.apply(replica, &diff, cancel).await?;

        let summary = CycleSummary::from_parts(copy, deletion, started_at, Utc::now());
        tracing::info!("Sync cycle complete. {summary}");
        Ok(summary)
    }

    async fn ensure_replica_root(&self, replica: &Path) -> Result<()> {
        match self.fs.entry_kind(replica).await? {
            Some(EntryKind::Directory | EntryKind::Link) => Ok(()),
            Some(_) => Err(crate::Error::root_not_found(replica)),
            None => {
                tracing::info!(path = %replica.display(), "Creating replica directory");
                self.fs.create_dir_all(replica).await?;
                Ok(())
            }
        }
    }
}

//! Per-cycle outcome report

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{CopyStats, DeletionStats};

/// What one sync cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub files_copied: u64,
    pub files_updated: u64,
    pub files_deleted: u64,
    pub dirs_created: u64,
    pub dirs_deleted: u64,
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CycleSummary {
    /// Combine the apply results of a cycle that ran from `started_at` to
    /// `finished_at`.
    pub fn from_parts(
        copy: CopyStats,
        deletion: DeletionStats,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            files_copied: copy.files_copied,
            files_updated: copy.files_updated,
            files_deleted: deletion.files_deleted,
            dirs_created: copy.dirs_created,
            dirs_deleted: deletion.dirs_deleted,
            elapsed: (finished_at - started_at).to_std().unwrap_or_default(),
            started_at,
            finished_at,
        }
    }

    /// Total number of entries touched.
    pub fn total_changes(&self) -> u64 {
        self.files_copied
            + self.files_updated
            + self.files_deleted
            + self.dirs_created
            + self.dirs_deleted
    }
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Files copied: {}, files updated: {}, files deleted: {}, dirs created: {}, dirs deleted: {}, elapsed: {:.2?}",
            self.files_copied,
            self.files_updated,
            self.files_deleted,
            self.dirs_created,
            self.dirs_deleted,
            self.elapsed
        )
    }
}

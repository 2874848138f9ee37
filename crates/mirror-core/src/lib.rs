//! Sync engine for Folder Mirror
//!
//! One-way mirroring of a source tree into a replica tree, built from small
//! single-purpose pieces:
//!
//! - **Snapshots**: [`SnapshotBuilder`] walks a tree into a [`DirectorySnapshot`]
//! - **Diff**: [`DiffEngine`] turns two snapshots into a [`DiffResult`]
//! - **Apply**: [`CopyApplier`] and [`DeletionApplier`] carry the diff out
//! - **Orchestration**: [`SyncRunner`] runs one cycle, [`SyncLoop`] repeats it
//!
//! # Architecture
//!
//! ```text
//!                  mirror-cli
//!                      |
//!                 mirror-core
//!                      |
//!                  mirror-fs
//!          (OsFileSystem | MemoryFileSystem)
//! ```
//!
//! The engine only talks to the [`mirror_fs::FileSystem`] trait, so every
//! component can be exercised against the in-memory double.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use mirror_core::SyncRunner;
//! use mirror_fs::OsFileSystem;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> mirror_core::Result<()> {
//! let runner = SyncRunner::new(Arc::new(OsFileSystem::new()));
//! let summary = runner
//!     .run_once(Path::new("/data"), Path::new("/backup"), &CancellationToken::new())
//!     .await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod copy;
pub mod delete;
pub mod diff;
pub mod error;
pub mod runner;
pub mod snapshot;
pub mod summary;
pub mod sync_loop;

pub use copy::{CopyApplier, CopyStats};
pub use delete::{DeletionApplier, DeletionStats};
pub use diff::{DiffEngine, DiffResult, is_same_file};
pub use error::{Error, Result};
pub use runner::SyncRunner;
pub use snapshot::{DirectorySnapshot, SnapshotBuilder};
pub use summary::CycleSummary;
pub use sync_loop::{Phase, SyncLoop};

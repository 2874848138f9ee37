//! Error types for mirror-core

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

/// Result type for mirror-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a sync cycle
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A tree root is missing or is not a directory
    #[error("Root directory not found: {path}")]
    RootNotFound { path: PathBuf },

    /// A sync loop was configured with a zero interval
    #[error("Sync interval must be greater than zero")]
    ZeroInterval,

    /// The cancellation token fired between two units of work
    #[error("Sync cancelled")]
    Cancelled,

    /// Filesystem error from mirror-fs
    #[error(transparent)]
    Fs(#[from] mirror_fs::Error),
}

impl Error {
    pub fn root_not_found(path: &Path) -> Self {
        Self::RootNotFound {
            path: path.to_path_buf(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Fail with [`Error::Cancelled`] once `cancel` has fired.
pub(crate) fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

/// Decide whether a failed unit of work is skipped or ends the cycle.
///
/// Benign failures are logged (message at warn, full error at debug) and
/// swallowed; anything else is logged at error and handed back to the caller.
pub(crate) fn skip_or_fail(action: &str, err: mirror_fs::Error) -> Result<()> {
    let kind = err.kind();
    if kind.is_benign() {
        tracing::warn!(
            path = %err.path().display(),
            kind = %kind,
            "Skipping {action}"
        );
        tracing::debug!(error = ?err, "Skipped {action}");
        Ok(())
    } else {
        tracing::error!(
            path = %err.path().display(),
            error = ?err,
            "Failed to {action}"
        );
        Err(err.into())
    }
}

//! Error types for mirror-fs

use std::fmt;
use std::path::{Path, PathBuf};

/// Result type for mirror-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in filesystem operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Filesystem task for {path} did not complete: {message}")]
    TaskFailed { path: PathBuf, message: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify this error into the closed kind taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { source, .. } => ErrorKind::classify(source),
            Self::TaskFailed { .. } => ErrorKind::Unexpected,
        }
    }

    /// The path the failed operation was acting on.
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::TaskFailed { path, .. } => path,
        }
    }
}

/// Closed classification of filesystem failures.
///
/// Everything except [`ErrorKind::Unexpected`] is environmental (permissions,
/// a path that vanished, a device fault) and is recovered locally by the sync
/// engine. `Unexpected` indicates a defect or an unsupported situation and is
/// propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    PathTooLong,
    Io,
    Unexpected,
}

impl ErrorKind {
    /// Map a standard I/O error onto the taxonomy.
    pub fn classify(err: &std::io::Error) -> Self {
        use std::io::ErrorKind as Std;

        if is_name_too_long(err) {
            return Self::PathTooLong;
        }
        match err.kind() {
            Std::NotFound => Self::NotFound,
            Std::PermissionDenied => Self::PermissionDenied,
            Std::InvalidInput | Std::Unsupported | Std::OutOfMemory => Self::Unexpected,
            _ => Self::Io,
        }
    }

    pub fn is_benign(self) -> bool {
        !matches!(self, Self::Unexpected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::PathTooLong => "path too long",
            Self::Io => "i/o failure",
            Self::Unexpected => "unexpected failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_name_too_long(err: &std::io::Error) -> bool {
    match err.raw_os_error() {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        Some(36) => true,
        #[cfg(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd"
        ))]
        Some(63) => true,
        #[cfg(windows)]
        Some(206) => true,
        _ => false,
    }
}

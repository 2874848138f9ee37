//! File metadata and directory entry types

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Size and UTC modification time of a regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMetadata {
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl FileMetadata {
    pub fn new(size: u64, modified: DateTime<Utc>) -> Self {
        Self { size, modified }
    }
}

/// What a directory entry is, determined without following links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    /// Symbolic link, junction or other reparse point
    Link,
    /// Sockets, FIFOs, device nodes
    Other,
}

/// A single child returned by [`crate::FileSystem::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Full path of the entry
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// The entry's own name, lossily converted to UTF-8.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

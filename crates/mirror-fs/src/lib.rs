//! Filesystem capability layer for Folder Mirror
//!
//! Provides root-relative path handling, file metadata, a closed error-kind
//! taxonomy, and the [`FileSystem`] trait the sync engine is written against.
//! Two implementations are shipped: [`OsFileSystem`] for the real filesystem
//! and [`MemoryFileSystem`], an in-memory double with fault injection.

pub mod error;
pub mod fs;
pub mod io;
pub mod memory;
pub mod metadata;
pub mod os;
pub mod path;

pub use error::{Error, ErrorKind, Result};
pub use fs::FileSystem;
pub use io::copy_atomic;
pub use memory::{MemoryFileSystem, Operation};
pub use metadata::{DirEntry, EntryKind, FileMetadata};
pub use os::OsFileSystem;
pub use path::{CasePolicy, RelativePath};

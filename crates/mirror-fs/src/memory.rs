//! In-memory [`FileSystem`] double for engine tests
//!
//! Models directories, files, links and read-only flags closely enough for the
//! sync engine: parents must exist before children are created, non-empty
//! directories cannot be removed, read-only files cannot be deleted. Faults can
//! be injected per operation and path to exercise error handling.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{DirEntry, EntryKind, Error, FileMetadata, FileSystem, Result};

/// Operations that faults can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    EntryKind,
    ReadDir,
    /// Inspecting one child while its parent is listed
    InspectEntry,
    Metadata,
    CreateDir,
    Copy,
    Rename,
    Replace,
    SetModified,
    ClearReadonly,
    RemoveFile,
    RemoveDir,
}

#[derive(Debug, Clone)]
enum Node {
    Directory {
        readonly: bool,
    },
    File {
        data: Vec<u8>,
        modified: DateTime<Utc>,
        readonly: bool,
    },
    Link,
}

impl Node {
    fn kind(&self) -> EntryKind {
        match self {
            Self::Directory { .. } => EntryKind::Directory,
            Self::File { .. } => EntryKind::File,
            Self::Link => EntryKind::Link,
        }
    }
}

#[derive(Debug, Clone)]
struct Fault {
    operation: Operation,
    path: PathBuf,
    kind: io::ErrorKind,
    /// For copies: write half of the data before failing
    partial: bool,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<PathBuf, Node>,
    faults: Vec<Fault>,
}

impl State {
    fn fault(&self, operation: Operation, paths: &[&Path]) -> Option<Fault> {
        self.faults
            .iter()
            .find(|f| f.operation == operation && paths.iter().any(|p| *p == f.path))
            .cloned()
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.nodes.get(path), Some(Node::Directory { .. }))
    }

    fn require_parent(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if parent.parent().is_some() && !self.is_dir(parent) => {
                Err(io::Error::from(io::ErrorKind::NotFound))
            }
            _ => Ok(()),
        }
    }

    fn children(&self, path: &Path) -> impl Iterator<Item = (&PathBuf, &Node)> {
        self.nodes
            .iter()
            .filter(move |(p, _)| p.parent() == Some(path))
    }

    fn mkdir_all(&mut self, path: &Path) -> io::Result<()> {
        let mut missing = Vec::new();
        let mut cursor = Some(path);
        while let Some(current) = cursor {
            // The filesystem root always exists
            if current.parent().is_none() {
                break;
            }
            match self.nodes.get(current) {
                Some(Node::Directory { .. }) => break,
                Some(_) => return Err(io::Error::from(io::ErrorKind::AlreadyExists)),
                None => missing.push(current.to_path_buf()),
            }
            cursor = current.parent();
        }
        for dir in missing.into_iter().rev() {
            self.nodes.insert(dir, Node::Directory { readonly: false });
        }
        Ok(())
    }
}

fn injected(fault: &Fault) -> io::Error {
    io::Error::new(
        fault.kind,
        format!("injected {:?} fault at {}", fault.operation, fault.path.display()),
    )
}

/// In-memory filesystem with fault injection.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: Mutex<State>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a directory and its ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        // Paths added by tests never collide with files
        let _ = self.state().mkdir_all(path.as_ref());
        self
    }

    /// Create a file (and its parent directories) with the given content.
    pub fn add_file(
        &self,
        path: impl AsRef<Path>,
        data: impl Into<Vec<u8>>,
        modified: DateTime<Utc>,
    ) -> &Self {
        let path = path.as_ref();
        let mut state = self.state();
        if let Some(parent) = path.parent() {
            let _ = state.mkdir_all(parent);
        }
        state.nodes.insert(
            path.to_path_buf(),
            Node::File {
                data: data.into(),
                modified,
                readonly: false,
            },
        );
        self
    }

    /// Create a symbolic link entry.
    pub fn add_link(&self, path: impl AsRef<Path>) -> &Self {
        let path = path.as_ref();
        let mut state = self.state();
        if let Some(parent) = path.parent() {
            let _ = state.mkdir_all(parent);
        }
        state.nodes.insert(path.to_path_buf(), Node::Link);
        self
    }

    pub fn set_readonly(&self, path: impl AsRef<Path>, value: bool) -> &Self {
        if let Some(Node::File { readonly, .. } | Node::Directory { readonly }) =
            self.state().nodes.get_mut(path.as_ref())
        {
            *readonly = value;
        }
        self
    }

    /// Make `operation` fail with `kind` whenever it touches `path`.
    pub fn inject_fault(
        &self,
        operation: Operation,
        path: impl AsRef<Path>,
        kind: io::ErrorKind,
    ) -> &Self {
        self.state().faults.push(Fault {
            operation,
            path: path.as_ref().to_path_buf(),
            kind,
            partial: false,
        });
        self
    }

    /// Make copies reading from `source` write half the data and then fail.
    pub fn inject_partial_copy(&self, source: impl AsRef<Path>) -> &Self {
        self.state().faults.push(Fault {
            operation: Operation::Copy,
            path: source.as_ref().to_path_buf(),
            kind: io::ErrorKind::BrokenPipe,
            partial: true,
        });
        self
    }

    pub fn clear_faults(&self) {
        self.state().faults.clear();
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.state().nodes.contains_key(path.as_ref())
    }

    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        self.state().is_dir(path.as_ref())
    }

    pub fn is_file(&self, path: impl AsRef<Path>) -> bool {
        matches!(self.state().nodes.get(path.as_ref()), Some(Node::File { .. }))
    }

    pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.state().nodes.get(path.as_ref()) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn modified(&self, path: impl AsRef<Path>) -> Option<DateTime<Utc>> {
        match self.state().nodes.get(path.as_ref()) {
            Some(Node::File { modified, .. }) => Some(*modified),
            _ => None,
        }
    }

    pub fn is_readonly(&self, path: impl AsRef<Path>) -> bool {
        matches!(
            self.state().nodes.get(path.as_ref()),
            Some(Node::File { readonly: true, .. } | Node::Directory { readonly: true })
        )
    }

    /// Every path currently present, in sorted order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.state().nodes.keys().cloned().collect()
    }

    fn run<T>(
        &self,
        operation: Operation,
        path: &Path,
        other: Option<&Path>,
        op: impl FnOnce(&mut State) -> io::Result<T>,
    ) -> Result<T> {
        let mut state = self.state();
        let mut paths = vec![path];
        paths.extend(other);
        if let Some(fault) = state.fault(operation, &paths) {
            return Err(Error::io(path, injected(&fault)));
        }
        op(&mut *state).map_err(|e| Error::io(path, e))
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn entry_kind(&self, path: &Path) -> Result<Option<EntryKind>> {
        self.run(Operation::EntryKind, path, None, |state| {
            Ok(state.nodes.get(path).map(Node::kind))
        })
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<Result<DirEntry>>> {
        self.run(Operation::ReadDir, path, None, |state| {
            let state: &State = state;
            match state.nodes.get(path) {
                Some(Node::Directory { .. }) => Ok(state
                    .children(path)
                    .map(|(p, node)| match state.fault(Operation::InspectEntry, &[p.as_path()]) {
                        Some(fault) => Err(Error::io(p, injected(&fault))),
                        None => Ok(DirEntry::new(p.clone(), node.kind())),
                    })
                    .collect()),
                Some(_) => Err(io::Error::from(io::ErrorKind::NotADirectory)),
                None => Err(io::Error::from(io::ErrorKind::NotFound)),
            }
        })
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        self.run(Operation::Metadata, path, None, |state| {
            match state.nodes.get(path) {
                Some(Node::File { data, modified, .. }) => {
                    Ok(FileMetadata::new(data.len() as u64, *modified))
                }
                Some(_) => Err(io::Error::from(io::ErrorKind::IsADirectory)),
                None => Err(io::Error::from(io::ErrorKind::NotFound)),
            }
        })
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.run(Operation::CreateDir, path, None, |state| state.mkdir_all(path))
    }

    async fn copy_contents(&self, from: &Path, to: &Path) -> Result<u64> {
        let mut state = self.state();
        let Some(Node::File { data, .. }) = state.nodes.get(from).cloned() else {
            return Err(Error::io(from, io::Error::from(io::ErrorKind::NotFound)));
        };
        state.require_parent(to).map_err(|e| Error::io(to, e))?;
        if state.is_dir(to) {
            return Err(Error::io(to, io::Error::from(io::ErrorKind::IsADirectory)));
        }

        let fault = state.fault(Operation::Copy, &[from, to]);
        let written = match &fault {
            Some(f) if f.partial => data[..data.len() / 2].to_vec(),
            Some(f) => return Err(Error::io(to, injected(f))),
            None => data,
        };
        let len = written.len() as u64;
        state.nodes.insert(
            to.to_path_buf(),
            Node::File {
                data: written,
                modified: Utc::now(),
                readonly: false,
            },
        );

        match fault {
            Some(f) => Err(Error::io(to, injected(&f))),
            None => Ok(len),
        }
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.run(Operation::Rename, to, Some(from), |state| {
            if !state.nodes.contains_key(from) {
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
            state.require_parent(to)?;
            if state.is_dir(to) {
                return Err(io::Error::from(io::ErrorKind::IsADirectory));
            }
            let moved: Vec<PathBuf> = state
                .nodes
                .keys()
                .filter(|p| p.starts_with(from))
                .cloned()
                .collect();
            for old in moved {
                if let Some(node) = state.nodes.remove(&old) {
                    let suffix = old.strip_prefix(from).unwrap_or(Path::new(""));
                    let new = if suffix.as_os_str().is_empty() {
                        to.to_path_buf()
                    } else {
                        to.join(suffix)
                    };
                    state.nodes.insert(new, node);
                }
            }
            Ok(())
        })
    }

    async fn replace(&self, from: &Path, to: &Path) -> Result<()> {
        self.run(Operation::Replace, to, Some(from), |state| {
            let keep_readonly = match state.nodes.get(to) {
                Some(Node::File { readonly, .. }) => *readonly,
                Some(_) => return Err(io::Error::from(io::ErrorKind::IsADirectory)),
                None => return Err(io::Error::from(io::ErrorKind::NotFound)),
            };
            match state.nodes.remove(from) {
                Some(Node::File { data, modified, .. }) => {
                    state.nodes.insert(
                        to.to_path_buf(),
                        Node::File {
                            data,
                            modified,
                            readonly: keep_readonly,
                        },
                    );
                    Ok(())
                }
                Some(other) => {
                    state.nodes.insert(from.to_path_buf(), other);
                    Err(io::Error::from(io::ErrorKind::IsADirectory))
                }
                None => Err(io::Error::from(io::ErrorKind::NotFound)),
            }
        })
    }

    async fn set_modified(&self, path: &Path, value: DateTime<Utc>) -> Result<()> {
        self.run(Operation::SetModified, path, None, |state| {
            match state.nodes.get_mut(path) {
                Some(Node::File { modified, .. }) => {
                    *modified = value;
                    Ok(())
                }
                Some(_) => Err(io::Error::from(io::ErrorKind::IsADirectory)),
                None => Err(io::Error::from(io::ErrorKind::NotFound)),
            }
        })
    }

    async fn clear_readonly(&self, path: &Path) -> Result<bool> {
        self.run(Operation::ClearReadonly, path, None, |state| {
            match state.nodes.get_mut(path) {
                Some(Node::File { readonly, .. } | Node::Directory { readonly }) => {
                    Ok(std::mem::replace(readonly, false))
                }
                Some(Node::Link) => Ok(false),
                None => Err(io::Error::from(io::ErrorKind::NotFound)),
            }
        })
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        self.run(Operation::RemoveFile, path, None, |state| {
            match state.nodes.get(path) {
                Some(Node::File { readonly: true, .. }) => {
                    Err(io::Error::from(io::ErrorKind::PermissionDenied))
                }
                Some(Node::File { .. } | Node::Link) => {
                    state.nodes.remove(path);
                    Ok(())
                }
                Some(Node::Directory { .. }) => Err(io::Error::from(io::ErrorKind::IsADirectory)),
                None => Err(io::Error::from(io::ErrorKind::NotFound)),
            }
        })
    }

    async fn remove_dir(&self, path: &Path) -> Result<()> {
        self.run(Operation::RemoveDir, path, None, |state| {
            match state.nodes.get(path) {
                Some(Node::Directory { .. }) => {
                    if state.children(path).next().is_some() {
                        return Err(io::Error::from(io::ErrorKind::DirectoryNotEmpty));
                    }
                    state.nodes.remove(path);
                    Ok(())
                }
                Some(_) => Err(io::Error::from(io::ErrorKind::NotADirectory)),
                None => Err(io::Error::from(io::ErrorKind::NotFound)),
            }
        })
    }

    async fn is_dir_empty(&self, path: &Path) -> Result<bool> {
        self.run(Operation::ReadDir, path, None, |state| {
            if !state.is_dir(path) {
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
            Ok(state.children(path).next().is_none())
        })
    }
}

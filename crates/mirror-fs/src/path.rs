//! Root-relative path handling with a platform comparison policy

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// How two relative paths are compared for equality and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasePolicy {
    /// Byte-for-byte comparison (Linux and most Unix filesystems)
    Sensitive,
    /// Case-folded comparison (Windows, macOS default volumes)
    Insensitive,
}

impl CasePolicy {
    /// The policy matching the host platform's default filesystem.
    pub const fn current() -> Self {
        if cfg!(any(windows, target_os = "macos")) {
            Self::Insensitive
        } else {
            Self::Sensitive
        }
    }

    fn key(self, path: &str) -> String {
        match self {
            Self::Sensitive => path.to_string(),
            Self::Insensitive => path.to_lowercase(),
        }
    }
}

/// A path relative to a tree root, normalized to forward slashes.
///
/// Separators are normalized, empty and `.` segments are dropped and trailing
/// separators are trimmed, so the root itself is the empty path. Equality,
/// hashing and ordering go through a comparison key derived with a
/// [`CasePolicy`], which makes `RelativePath` safe to use directly as a map or
/// set key under the platform's path semantics.
#[derive(Debug, Clone)]
pub struct RelativePath {
    /// Internal representation always uses forward slashes
    inner: String,
    /// Comparison key derived from `inner`
    key: String,
    policy: CasePolicy,
}

impl RelativePath {
    /// Create a relative path using the host [`CasePolicy`].
    pub fn new(path: impl AsRef<str>) -> Self {
        Self::with_policy(path, CasePolicy::current())
    }

    /// Create a relative path compared under an explicit policy.
    pub fn with_policy(path: impl AsRef<str>, policy: CasePolicy) -> Self {
        let normalized = path.as_ref().replace('\\', "/");
        let inner = normalized
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect::<Vec<_>>()
            .join("/");
        let key = policy.key(&inner);
        Self { inner, key, policy }
    }

    /// The empty path denoting the tree root.
    pub fn root() -> Self {
        Self {
            inner: String::new(),
            key: String::new(),
            policy: CasePolicy::current(),
        }
    }

    /// Compute the path of `full` relative to `root`.
    ///
    /// Returns `None` when `full` is not located under `root`.
    pub fn from_root(root: &Path, full: &Path) -> Option<Self> {
        let relative = full.strip_prefix(root).ok()?;
        Some(Self::new(relative.to_string_lossy()))
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn is_root(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of segments; the root has depth 0.
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.inner.matches('/').count() + 1
        }
    }

    /// Join this path with a single name or a relative sub-path.
    pub fn join(&self, segment: &str) -> Self {
        let policy = self.policy();
        if self.is_root() {
            Self::with_policy(segment, policy)
        } else {
            Self::with_policy(format!("{}/{}", self.inner, segment), policy)
        }
    }

    /// Get the parent path; `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let parent = match self.inner.rfind('/') {
            Some(idx) => &self.inner[..idx],
            None => "",
        };
        Some(Self::with_policy(parent, self.policy()))
    }

    /// Get the final segment; `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.inner.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Resolve this path under `root` as a platform-native path.
    pub fn to_native(&self, root: &Path) -> PathBuf {
        let mut native = root.to_path_buf();
        if !self.is_root() {
            native.extend(self.inner.split('/'));
        }
        native
    }

    pub fn policy(&self) -> CasePolicy {
        self.policy
    }
}

impl PartialEq for RelativePath {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for RelativePath {}

impl Hash for RelativePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for RelativePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RelativePath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for RelativePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RelativePath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

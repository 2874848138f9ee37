//! [`TestTree`] builder for mirroring test scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use filetime::FileTime;
use tempfile::TempDir;

/// A temporary directory tree with helpers for setup and assertion.
///
/// All `rel` arguments are forward-slash paths relative to [`TestTree::root`].
///
/// # Example
///
/// ```rust,no_run
/// use mirror_test_utils::TestTree;
///
/// let source = TestTree::new();
/// source.write("docs/readme.txt", "hello");
/// source.assert_file_exists("docs/readme.txt");
/// ```
pub struct TestTree {
    temp_dir: TempDir,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Resolve `rel` under the root.
    pub fn path(&self, rel: &str) -> PathBuf {
        let mut full = self.root().to_path_buf();
        full.extend(rel.split('/').filter(|s| !s.is_empty()));
        full
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let full = self.path(rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full, contents).unwrap();
        full
    }

    /// Write a file and stamp its modification time.
    pub fn write_at(&self, rel: &str, contents: impl AsRef<[u8]>, modified: DateTime<Utc>) {
        self.write(rel, contents);
        self.set_mtime(rel, modified);
    }

    /// Create the directory `rel` and its ancestors.
    pub fn mkdir(&self, rel: &str) -> PathBuf {
        let full = self.path(rel);
        fs::create_dir_all(&full).unwrap();
        full
    }

    pub fn set_mtime(&self, rel: &str, modified: DateTime<Utc>) {
        let mtime = FileTime::from_system_time(modified.into());
        filetime::set_file_mtime(self.path(rel), mtime).unwrap();
    }

    pub fn mtime(&self, rel: &str) -> DateTime<Utc> {
        let modified = fs::metadata(self.path(rel)).unwrap().modified().unwrap();
        DateTime::<Utc>::from(modified)
    }

    /// Read a file as UTF-8.
    ///
    /// # Panics
    /// Panics with the offending path if the file cannot be read.
    pub fn read(&self, rel: &str) -> String {
        let full = self.path(rel);
        fs::read_to_string(&full)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full.display()))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn is_dir(&self, rel: &str) -> bool {
        self.path(rel).is_dir()
    }

    /// Mark the file at `rel` read-only.
    pub fn set_readonly(&self, rel: &str) {
        let full = self.path(rel);
        let mut permissions = fs::metadata(&full).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&full, permissions).unwrap();
    }

    /// Create a symbolic link at `rel` pointing to `target`.
    #[cfg(unix)]
    pub fn symlink(&self, target: impl AsRef<Path>, rel: &str) {
        std::os::unix::fs::symlink(target, self.path(rel)).unwrap();
    }

    /// Every file and directory below the root, as sorted relative paths.
    pub fn entries(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![self.root().to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                let rel = path
                    .strip_prefix(self.root())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/");
                if fs::symlink_metadata(&path).unwrap().is_dir() {
                    stack.push(path);
                    out.push(format!("{rel}/"));
                } else {
                    out.push(rel);
                }
            }
        }
        out.sort();
        out
    }

    /// Assert that `rel` exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, rel: &str) {
        let full = self.path(rel);
        assert!(full.exists(), "Expected file to exist: {}", full.display());
    }

    /// Assert that `rel` does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, rel: &str) {
        let full = self.path(rel);
        assert!(
            !full.exists(),
            "Expected file NOT to exist: {}",
            full.display()
        );
    }

    /// Assert that the file at `rel` holds exactly `expected`.
    pub fn assert_content(&self, rel: &str, expected: &str) {
        let actual = self.read(rel);
        assert!(
            actual == expected,
            "File {} has unexpected content.\nExpected: {}\nActual: {}",
            self.path(rel).display(),
            expected,
            actual
        );
    }
}

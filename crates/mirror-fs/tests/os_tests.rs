//! Tests for the OS-backed filesystem against real temporary directories

use assert_fs::prelude::*;
use chrono::{DateTime, TimeZone, Utc};
use mirror_fs::{EntryKind, ErrorKind, FileSystem, OsFileSystem, copy_atomic};
use std::fs;
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 15, 10, 0, 0).unwrap()
}

#[tokio::test]
async fn test_entry_kind_reports_files_dirs_and_missing() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("dir").create_dir_all().unwrap();
    temp.child("file.txt").write_str("x").unwrap();
    let fs = OsFileSystem::new();

    assert_eq!(
        fs.entry_kind(&temp.path().join("dir")).await.unwrap(),
        Some(EntryKind::Directory)
    );
    assert_eq!(
        fs.entry_kind(&temp.path().join("file.txt")).await.unwrap(),
        Some(EntryKind::File)
    );
    assert_eq!(fs.entry_kind(&temp.path().join("nope")).await.unwrap(), None);
}

#[cfg(unix)]
#[tokio::test]
async fn test_entry_kind_does_not_follow_symlinks() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("real").create_dir_all().unwrap();
    std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("link")).unwrap();
    let fs = OsFileSystem::new();

    assert_eq!(
        fs.entry_kind(&temp.path().join("link")).await.unwrap(),
        Some(EntryKind::Link)
    );
}

#[tokio::test]
async fn test_read_dir_is_sorted() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("b.txt").touch().unwrap();
    temp.child("a.txt").touch().unwrap();
    temp.child("c").create_dir_all().unwrap();
    let fs = OsFileSystem::new();

    let entries: Vec<_> = fs
        .read_dir(temp.path())
        .await
        .unwrap()
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c"]);
    assert_eq!(entries[2].kind, EntryKind::Directory);
}

#[cfg(unix)]
#[tokio::test]
async fn test_read_dir_reports_uninspectable_children_individually() {
    use std::os::unix::fs::PermissionsExt;

    let temp = assert_fs::TempDir::new().unwrap();
    let listed = temp.child("listed");
    listed.child("a.txt").write_str("a").unwrap();
    listed.child("b.txt").write_str("b").unwrap();
    // Readable but not searchable: names can be listed, children cannot be stat'ed
    fs::set_permissions(listed.path(), fs::Permissions::from_mode(0o444)).unwrap();
    let privileged = fs::symlink_metadata(listed.path().join("a.txt")).is_ok();

    let result = OsFileSystem::new().read_dir(listed.path()).await;
    fs::set_permissions(listed.path(), fs::Permissions::from_mode(0o755)).unwrap();

    let entries = result.unwrap();
    assert_eq!(entries.len(), 2);
    if privileged {
        // Running as root: permission bits do not apply
        assert!(entries.iter().all(Result::is_ok));
        return;
    }
    for (entry, name) in entries.iter().zip(["a.txt", "b.txt"]) {
        let err = entry.as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(err.path(), listed.path().join(name));
    }
}

#[tokio::test]
async fn test_read_dir_missing_is_not_found() {
    let temp = TempDir::new().unwrap();
    let fs = OsFileSystem::new();

    let err = fs.read_dir(&temp.path().join("gone")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.kind().is_benign());
}

#[tokio::test]
async fn test_metadata_reports_size_and_mtime() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ten.bin");
    fs::write(&path, [0u8; 10]).unwrap();
    let fs = OsFileSystem::new();

    fs.set_modified(&path, t0()).await.unwrap();
    let meta = fs.metadata(&path).await.unwrap();

    assert_eq!(meta.size, 10);
    assert_eq!(meta.modified, t0());
}

#[tokio::test]
async fn test_copy_atomic_creates_file_with_mtime() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("src.txt");
    let destination = temp.path().join("out").join("dst.txt");
    fs::write(&source, "hello world").unwrap();
    let os = OsFileSystem::new();

    let bytes = copy_atomic(&os, &source, &destination, t0()).await.unwrap();

    assert_eq!(bytes, 11);
    assert_eq!(fs::read_to_string(&destination).unwrap(), "hello world");
    assert_eq!(os.metadata(&destination).await.unwrap().modified, t0());
}

#[tokio::test]
async fn test_copy_atomic_overwrites_existing() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("src.txt");
    let destination = temp.path().join("dst.txt");
    fs::write(&source, "updated").unwrap();
    fs::write(&destination, "original content").unwrap();
    let os = OsFileSystem::new();

    copy_atomic(&os, &source, &destination, t0()).await.unwrap();

    assert_eq!(fs::read_to_string(&destination).unwrap(), "updated");
}

#[tokio::test]
async fn test_copy_atomic_cleans_up_temp_file() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("src.txt");
    fs::write(&source, "content").unwrap();
    let os = OsFileSystem::new();

    copy_atomic(&os, &source, &temp.path().join("dst.txt"), t0())
        .await
        .unwrap();

    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(mirror_fs::io::TEMP_SUFFIX))
        .collect();
    assert!(leftovers.is_empty(), "temp files left: {leftovers:?}");
}

#[tokio::test]
async fn test_copy_atomic_missing_source_leaves_nothing_behind() {
    let temp = TempDir::new().unwrap();
    let destination = temp.path().join("dst.txt");
    let os = OsFileSystem::new();

    let err = copy_atomic(&os, &temp.path().join("missing"), &destination, t0())
        .await
        .unwrap_err();

    assert!(err.kind().is_benign());
    assert!(!destination.exists());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_replace_preserves_destination_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let source = temp.path().join("src.sh");
    let destination = temp.path().join("dst.sh");
    fs::write(&source, "new").unwrap();
    fs::write(&destination, "old").unwrap();
    fs::set_permissions(&destination, fs::Permissions::from_mode(0o750)).unwrap();
    let os = OsFileSystem::new();

    copy_atomic(&os, &source, &destination, t0()).await.unwrap();

    let mode = fs::metadata(&destination).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o750);
    assert_eq!(fs::read_to_string(&destination).unwrap(), "new");
}

#[tokio::test]
async fn test_replace_updates_readonly_destination() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("src.txt");
    let destination = temp.path().join("dst.txt");
    fs::write(&source, "new").unwrap();
    fs::write(&destination, "old").unwrap();
    let mut perms = fs::metadata(&destination).unwrap().permissions();
    perms.set_readonly(true);
    fs::set_permissions(&destination, perms).unwrap();
    let os = OsFileSystem::new();

    copy_atomic(&os, &source, &destination, t0()).await.unwrap();

    assert_eq!(fs::read_to_string(&destination).unwrap(), "new");
    assert!(fs::metadata(&destination).unwrap().permissions().readonly());
    assert_eq!(os.metadata(&destination).await.unwrap().modified, t0());

    // Let TempDir clean up on platforms that honour the flag
    os.clear_readonly(&destination).await.unwrap();
}

#[tokio::test]
async fn test_clear_readonly_makes_file_removable() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ro.txt");
    fs::write(&path, "x").unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_readonly(true);
    fs::set_permissions(&path, perms).unwrap();
    let os = OsFileSystem::new();

    assert!(os.clear_readonly(&path).await.unwrap());
    assert!(!fs::metadata(&path).unwrap().permissions().readonly());
    assert!(!os.clear_readonly(&path).await.unwrap());

    os.remove_file(&path).await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_remove_dir_refuses_non_empty() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("full/keep.txt").write_str("x").unwrap();
    temp.child("empty").create_dir_all().unwrap();
    let os = OsFileSystem::new();

    assert!(!os.is_dir_empty(&temp.path().join("full")).await.unwrap());
    assert!(os.is_dir_empty(&temp.path().join("empty")).await.unwrap());

    let err = os.remove_dir(&temp.path().join("full")).await.unwrap_err();
    assert!(err.kind().is_benign());
    assert!(temp.path().join("full/keep.txt").exists());

    os.remove_dir(&temp.path().join("empty")).await.unwrap();
    assert!(!temp.path().join("empty").exists());
}

//! End-to-end mirroring against the real filesystem
//!
//! Each test builds a source and a replica tree in temporary directories and
//! runs full cycles through `SyncRunner` with `OsFileSystem`.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use mirror_core::{CycleSummary, SnapshotBuilder, SyncRunner};
use mirror_fs::{OsFileSystem, RelativePath};
use mirror_test_utils::TestTree;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap()
}

async fn sync(source: &TestTree, replica: &TestTree) -> CycleSummary {
    SyncRunner::new(Arc::new(OsFileSystem::new()))
        .run_once(source.root(), replica.root(), &CancellationToken::new())
        .await
        .unwrap()
}

// =============================================================================
// Populating an empty replica
// =============================================================================

#[tokio::test]
async fn test_populates_empty_replica() {
    let source = TestTree::new();
    let replica = TestTree::new();
    source.write_at("a.txt", "0123456789", t0());
    source.mkdir("sub");

    let summary = sync(&source, &replica).await;

    assert_eq!(summary.files_copied, 1);
    assert_eq!(summary.dirs_created, 1);
    assert_eq!(summary.total_changes(), 2);
    replica.assert_content("a.txt", "0123456789");
    assert!(replica.is_dir("sub"));
    assert_eq!(replica.mtime("a.txt"), t0());
}

#[tokio::test]
async fn test_deep_tree_is_mirrored() {
    let source = TestTree::new();
    let replica = TestTree::new();
    source.write_at("one/two/three/leaf.txt", "leaf", t0());
    source.write_at("one/top.txt", "top", t0());
    source.mkdir("empty/inner");

    let summary = sync(&source, &replica).await;

    assert_eq!(summary.files_copied, 2);
    assert_eq!(summary.dirs_created, 5);
    assert_eq!(replica.entries(), source.entries());
}

// =============================================================================
// Updates and deletions
// =============================================================================

#[tokio::test]
async fn test_removed_source_file_is_deleted() {
    let source = TestTree::new();
    let replica = TestTree::new();
    source.write_at("keep.txt", "keep", t0());
    replica.write_at("keep.txt", "keep", t0());
    replica.write_at("old.txt", "old", t0());

    let summary = sync(&source, &replica).await;

    assert_eq!(summary.files_deleted, 1);
    assert_eq!(summary.total_changes(), 1);
    replica.assert_file_not_exists("old.txt");
    replica.assert_file_exists("keep.txt");
}

#[tokio::test]
async fn test_changed_content_is_updated() {
    let source = TestTree::new();
    let replica = TestTree::new();
    source.write_at("doc.txt", "version two", t0() + TimeDelta::hours(1));
    replica.write_at("doc.txt", "version one", t0());

    let summary = sync(&source, &replica).await;

    assert_eq!(summary.files_updated, 1);
    replica.assert_content("doc.txt", "version two");
    assert_eq!(replica.mtime("doc.txt"), t0() + TimeDelta::hours(1));
}

#[tokio::test]
async fn test_small_mtime_skew_is_tolerated() {
    let source = TestTree::new();
    let replica = TestTree::new();
    source.write_at("doc.txt", "same size", t0());
    replica.write_at("doc.txt", "same size", t0() + TimeDelta::seconds(1));

    let summary = sync(&source, &replica).await;

    assert_eq!(summary.total_changes(), 0);
    assert_eq!(replica.mtime("doc.txt"), t0() + TimeDelta::seconds(1));
}

#[tokio::test]
async fn test_nested_stale_directories_are_removed() {
    let source = TestTree::new();
    let replica = TestTree::new();
    replica.write_at("a/b/c/file.txt", "x", t0());

    let summary = sync(&source, &replica).await;

    assert_eq!(summary.files_deleted, 1);
    assert_eq!(summary.dirs_deleted, 3);
    assert!(replica.entries().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_readonly_replica_file_is_deleted() {
    let source = TestTree::new();
    let replica = TestTree::new();
    replica.write_at("locked.txt", "x", t0());
    replica.set_readonly("locked.txt");

    let summary = sync(&source, &replica).await;

    assert_eq!(summary.files_deleted, 1);
    replica.assert_file_not_exists("locked.txt");
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn test_second_cycle_is_a_no_op() {
    let source = TestTree::new();
    let replica = TestTree::new();
    source.write_at("a.txt", "a", t0());
    source.write_at("dir/b.txt", "bb", t0());
    replica.write_at("stale/c.txt", "c", t0());

    let first = sync(&source, &replica).await;
    let second = sync(&source, &replica).await;

    assert!(first.total_changes() > 0);
    assert_eq!(second.total_changes(), 0);
    assert_eq!(replica.entries(), source.entries());
}

#[tokio::test]
async fn test_no_temp_files_remain() {
    let source = TestTree::new();
    let replica = TestTree::new();
    for i in 0..5 {
        source.write_at(&format!("f{i}.bin"), vec![i as u8; 1024], t0());
    }

    sync(&source, &replica).await;

    assert!(
        replica
            .entries()
            .iter()
            .all(|e| !e.ends_with(mirror_fs::io::TEMP_SUFFIX)),
        "leftover temp files: {:?}",
        replica.entries()
    );
}

#[tokio::test]
async fn test_missing_replica_root_is_created() {
    let source = TestTree::new();
    let parent = TestTree::new();
    source.write_at("a.txt", "a", t0());
    let replica_root = parent.path("nested/replica");

    SyncRunner::new(Arc::new(OsFileSystem::new()))
        .run_once(source.root(), &replica_root, &CancellationToken::new())
        .await
        .unwrap();

    parent.assert_content("nested/replica/a.txt", "a");
}

// =============================================================================
// Links
// =============================================================================

#[cfg(unix)]
#[tokio::test]
async fn test_symlinks_are_not_followed() {
    let source = TestTree::new();
    let replica = TestTree::new();
    let outside = TestTree::new();
    outside.write("secret.txt", "outside the tree");
    source.write_at("real.txt", "real", t0());
    source.symlink(outside.root(), "linked-dir");
    source.symlink(outside.path("secret.txt"), "linked-file");

    let summary = sync(&source, &replica).await;

    assert_eq!(summary.files_copied, 1);
    assert_eq!(replica.entries(), vec!["real.txt".to_string()]);
}

// =============================================================================
// Concurrent churn
// =============================================================================

#[tokio::test]
async fn test_churning_siblings_never_hide_a_stable_file() {
    use std::sync::atomic::{AtomicBool, Ordering};

    let source = TestTree::new();
    source.write("stable.txt", "stable");
    for i in 0..200 {
        source.write(&format!("churn-{i}.tmp"), "x");
    }

    let stop = Arc::new(AtomicBool::new(false));
    let churner = {
        let (stop, root) = (stop.clone(), source.root().to_path_buf());
        std::thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                for i in 0..200 {
                    let path = root.join(format!("churn-{i}.tmp"));
                    let _ = std::fs::remove_file(&path);
                    let _ = std::fs::write(&path, "x");
                }
            }
        })
    };

    let builder = SnapshotBuilder::new(Arc::new(OsFileSystem::new()));
    let stable = RelativePath::new("stable.txt");
    let mut missing = 0;
    for _ in 0..150 {
        let snapshot = builder
            .build(source.root(), &CancellationToken::new())
            .await
            .unwrap();
        if !snapshot.files.contains_key(&stable) {
            missing += 1;
        }
    }

    stop.store(true, Ordering::Relaxed);
    churner.join().unwrap();
    assert_eq!(missing, 0);
}

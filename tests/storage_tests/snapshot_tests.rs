//! Snapshot Tests
//!
//! Tests verify:
//! - Snapshots restore the full bucket tree and LSN
//! - Corrupted or truncated snapshots are rejected

use bucketkv::engine::{BucketNode, Engine};
use bucketkv::storage::{Snapshot, HEADER_SIZE, MAGIC, VERSION};
use bucketkv::BucketKvError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

/// Builds a small tree through a real engine and returns its root
fn sample_tree(dir: &std::path::Path) -> BucketNode {
    let engine = Engine::open_path(dir).unwrap();
    engine
        .update(|tx| {
            let a = tx.create_bucket_if_not_exists(b"a")?;
            a.put(b"k1", b"v1")?;
            let b = a.create_bucket_if_not_exists(b"b")?;
            b.put(b"k2", b"v2")?;
            tx.create_bucket_if_not_exists(b"empty")?;
            Ok(())
        })
        .unwrap();
    engine.checkpoint().unwrap();
    Snapshot::load(&dir.join("snapshot.db")).unwrap().root
}

// =============================================================================
// Snapshot Tests
// =============================================================================

#[test]
fn test_snapshot_write_and_load() {
    let temp = TempDir::new().unwrap();
    let root = sample_tree(&temp.path().join("db"));

    let path = temp.path().join("copy.db");
    Snapshot::write(&path, &root, 17).unwrap();

    let loaded = Snapshot::load(&path).unwrap();
    assert_eq!(loaded.lsn, 17);
    assert_eq!(loaded.root, root);

    let a = loaded.root.child(b"a").unwrap();
    assert_eq!(a.value(b"k1"), Some(&b"v1"[..]));
    assert_eq!(a.child(b"b").unwrap().value(b"k2"), Some(&b"v2"[..]));
    assert!(loaded.root.child(b"empty").unwrap().is_empty());

    let names: Vec<&[u8]> = loaded.root.bucket_names().collect();
    assert_eq!(names, vec![&b"a"[..], &b"empty"[..]]);
}

#[test]
fn test_snapshot_of_empty_tree() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("snapshot.db");

    Snapshot::write(&path, &BucketNode::new(), 0).unwrap();
    let loaded = Snapshot::load(&path).unwrap();

    assert_eq!(loaded.lsn, 0);
    assert!(loaded.root.is_empty());
}

#[test]
fn test_snapshot_overwrite_is_atomic_replace() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("snapshot.db");

    Snapshot::write(&path, &BucketNode::new(), 1).unwrap();
    let root = sample_tree(&temp.path().join("db"));
    Snapshot::write(&path, &root, 2).unwrap();

    let loaded = Snapshot::load(&path).unwrap();
    assert_eq!(loaded.lsn, 2);
    assert_eq!(loaded.root, root);
    assert!(!temp.path().join("snapshot.tmp").exists());
}

#[test]
fn test_snapshot_detects_bit_flip() {
    let temp = TempDir::new().unwrap();
    let root = sample_tree(&temp.path().join("db"));
    let path = temp.path().join("snapshot.db");
    Snapshot::write(&path, &root, 3).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[HEADER_SIZE + 1] ^= 0x01;
    std::fs::write(&path, &bytes).unwrap();

    let err = Snapshot::load(&path).unwrap_err();
    assert!(matches!(err, BucketKvError::SnapshotCorruption(_)));
}

#[test]
fn test_snapshot_detects_truncation_and_bad_magic() {
    let temp = TempDir::new().unwrap();
    let root = sample_tree(&temp.path().join("db"));
    let path = temp.path().join("snapshot.db");
    Snapshot::write(&path, &root, 3).unwrap();
    let bytes = std::fs::read(&path).unwrap();

    std::fs::write(&path, &bytes[..bytes.len() - 2]).unwrap();
    assert!(matches!(
        Snapshot::load(&path),
        Err(BucketKvError::SnapshotCorruption(_))
    ));

    let mut bad_magic = bytes.clone();
    bad_magic[0] = b'X';
    std::fs::write(&path, &bad_magic).unwrap();
    assert!(matches!(
        Snapshot::load(&path),
        Err(BucketKvError::SnapshotCorruption(_))
    ));
}

#[test]
fn test_snapshot_rejects_impossible_length() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("snapshot.db");

    for declared in [u64::MAX, u64::MAX - 25, 1 << 40] {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&declared.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            Snapshot::load(&path),
            Err(BucketKvError::SnapshotCorruption(_))
        ));
    }

    // The engine refuses to open instead of panicking
    let data_dir = temp.path().join("db");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::copy(&path, data_dir.join("snapshot.db")).unwrap();
    assert!(matches!(
        Engine::open_path(&data_dir),
        Err(BucketKvError::SnapshotCorruption(_))
    ));
}

//! Tests for path resolution
//!
//! These tests verify:
//! - Resolution of root-level and nested paths
//! - Early exit at the first missing level
//! - Resolution never creates buckets
//! - Plain keys are never resolved as buckets

use bucketkv::engine::Engine;
use bucketkv::resolver::{resolve, Resolution};
use bucketkv::BucketKvError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();
    (temp_dir, engine)
}

fn path(parts: &[&str]) -> Vec<Vec<u8>> {
    parts.iter().map(|p| p.as_bytes().to_vec()).collect()
}

/// Builds a -> b -> c with a value at a/b
fn setup_tree(engine: &Engine) {
    engine
        .update(|tx| {
            let a = tx.create_bucket_if_not_exists(b"a")?;
            let b = a.create_bucket_if_not_exists(b"b")?;
            b.create_bucket_if_not_exists(b"c")?;
            b.put(b"leaf", b"value")?;
            Ok(())
        })
        .unwrap();
}

// =============================================================================
// Resolution Tests
// =============================================================================

#[test]
fn test_resolve_root_level_bucket() {
    let (_temp, engine) = setup_engine();
    setup_tree(&engine);

    let tx = engine.begin_read().unwrap();
    match resolve(&tx, &path(&["a"])) {
        Resolution::Found(bucket) => assert_eq!(bucket.path(), path(&["a"]).as_slice()),
        Resolution::NotFound => panic!("Expected bucket a"),
    }
}

#[test]
fn test_resolve_nested_bucket() {
    let (_temp, engine) = setup_engine();
    setup_tree(&engine);

    let tx = engine.begin_read().unwrap();
    let bucket = resolve(&tx, &path(&["a", "b"])).found().unwrap();
    assert_eq!(bucket.get(b"leaf"), Some(b"value".to_vec()));

    assert!(resolve(&tx, &path(&["a", "b", "c"])).is_found());
}

#[test]
fn test_resolve_missing_levels() {
    let (_temp, engine) = setup_engine();
    setup_tree(&engine);

    let tx = engine.begin_read().unwrap();
    assert!(!resolve(&tx, &path(&["x"])).is_found());
    assert!(!resolve(&tx, &path(&["x", "b"])).is_found());
    assert!(!resolve(&tx, &path(&["a", "x", "c"])).is_found());
    assert!(!resolve(&tx, &path(&["a", "b", "c", "d"])).is_found());
}

#[test]
fn test_resolve_empty_path_is_not_found() {
    let (_temp, engine) = setup_engine();
    setup_tree(&engine);

    let tx = engine.begin_read().unwrap();
    let err = resolve(&tx, &[]).found().unwrap_err();
    assert!(matches!(err, BucketKvError::PathNotFound));
}

#[test]
fn test_resolve_does_not_treat_keys_as_buckets() {
    let (_temp, engine) = setup_engine();
    setup_tree(&engine);

    let tx = engine.begin_read().unwrap();
    assert!(!resolve(&tx, &path(&["a", "b", "leaf"])).is_found());
}

#[test]
fn test_resolve_never_creates() {
    let (_temp, engine) = setup_engine();

    let tx = engine.begin_write().unwrap();
    assert!(!resolve(&tx, &path(&["a", "b"])).is_found());
    assert_eq!(tx.pending_len(), 0);
    assert!(tx.bucket(b"a").is_none());
    tx.commit().unwrap();

    assert_eq!(engine.last_lsn(), 0);
}

#[test]
fn test_resolve_sees_uncommitted_buckets_in_same_tx() {
    let (_temp, engine) = setup_engine();

    let tx = engine.begin_write().unwrap();
    tx.create_bucket_if_not_exists(b"a").unwrap();
    tx.bucket(b"a").unwrap().create_bucket_if_not_exists(b"b").unwrap();

    assert!(resolve(&tx, &path(&["a", "b"])).is_found());
    tx.rollback();

    let tx = engine.begin_read().unwrap();
    assert!(!resolve(&tx, &path(&["a"])).is_found());
}

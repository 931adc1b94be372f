//! Tests for Service
//!
//! These tests verify:
//! - Bucket creation at the root and nested, idempotently
//! - Set/get/delete of keys inside nested buckets
//! - The bucket-not-found / key-not-found taxonomy
//! - Recursive bucket deletion
//! - Response rendering through execute()

use std::sync::Arc;
use std::thread;

use bucketkv::config::Config;
use bucketkv::protocol::{Method, Query, Request};
use bucketkv::{BucketKvError, Engine, ErrorKind, Service};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_service() -> (TempDir, Service) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, Service::new(Arc::new(engine)))
}

fn path(parts: &[&str]) -> Vec<Vec<u8>> {
    parts.iter().map(|p| p.as_bytes().to_vec()).collect()
}

// =============================================================================
// CreateBucket Tests
// =============================================================================

#[test]
fn test_create_root_bucket_is_idempotent() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"a").unwrap();
    service.create_bucket(&[], b"a").unwrap();

    service.set_key(&path(&["a"]), b"k", b"v").unwrap();
    assert_eq!(service.get_key(&path(&["a"]), b"k").unwrap(), b"v");
}

#[test]
fn test_create_nested_bucket_is_idempotent() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"a").unwrap();
    service.create_bucket(&path(&["a"]), b"b").unwrap();
    service.create_bucket(&path(&["a"]), b"b").unwrap();

    service.set_key(&path(&["a", "b"]), b"k", b"v").unwrap();

    // Re-creating must not wipe existing contents
    service.create_bucket(&path(&["a"]), b"b").unwrap();
    assert_eq!(service.get_key(&path(&["a", "b"]), b"k").unwrap(), b"v");
}

#[test]
fn test_create_bucket_under_missing_parent() {
    let (_temp, service) = setup_service();

    let err = service.create_bucket(&path(&["missing"]), b"b").unwrap_err();
    assert!(matches!(err, BucketKvError::PathNotFound));
    assert_eq!(err.kind(), ErrorKind::BucketNotFound);
}

#[test]
fn test_create_bucket_only_creates_last_level() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"a").unwrap();
    let err = service.create_bucket(&path(&["a", "b"]), b"c").unwrap_err();
    assert!(matches!(err, BucketKvError::PathNotFound));

    // "b" must not have been created implicitly
    let err = service.set_key(&path(&["a", "b"]), b"k", b"v").unwrap_err();
    assert!(matches!(err, BucketKvError::PathNotFound));
}

#[test]
fn test_create_bucket_over_existing_key() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"a").unwrap();
    service.set_key(&path(&["a"]), b"name", b"value").unwrap();

    let err = service.create_bucket(&path(&["a"]), b"name").unwrap_err();
    assert!(matches!(err, BucketKvError::IncompatibleValue));
    assert_eq!(err.kind(), ErrorKind::Engine);
}

// =============================================================================
// SetKey / GetKey Tests
// =============================================================================

#[test]
fn test_set_get_round_trip() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"test").unwrap();
    service.set_key(&path(&["test"]), b"hola", b"mon").unwrap();

    assert_eq!(service.get_key(&path(&["test"]), b"hola").unwrap(), b"mon");
}

#[test]
fn test_set_overwrites_previous_value() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"test").unwrap();
    service.set_key(&path(&["test"]), b"key", b"value1").unwrap();
    service.set_key(&path(&["test"]), b"key", b"value2").unwrap();

    assert_eq!(service.get_key(&path(&["test"]), b"key").unwrap(), b"value2");
}

#[test]
fn test_set_empty_value() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"test").unwrap();
    service.set_key(&path(&["test"]), b"key", b"").unwrap();

    assert_eq!(service.get_key(&path(&["test"]), b"key").unwrap(), Vec::<u8>::new());
}

#[test]
fn test_get_missing_key_in_existing_bucket() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"test").unwrap();

    let err = service.get_key(&path(&["test"]), b"never").unwrap_err();
    assert!(matches!(err, BucketKvError::KeyNotFound));
    assert_eq!(err.kind(), ErrorKind::KeyNotFound);
}

#[test]
fn test_set_into_missing_bucket_persists_nothing() {
    let (_temp, service) = setup_service();

    let err = service.set_key(&path(&["test"]), b"a", b"b").unwrap_err();
    assert!(matches!(err, BucketKvError::PathNotFound));

    // Creating the bucket afterwards shows it empty
    service.create_bucket(&[], b"test").unwrap();
    let err = service.get_key(&path(&["test"]), b"a").unwrap_err();
    assert!(matches!(err, BucketKvError::KeyNotFound));
    assert_eq!(service.engine().last_lsn(), 1);
}

#[test]
fn test_get_through_missing_intermediate_bucket() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"a").unwrap();

    let err = service.get_key(&path(&["a", "missing", "deeper"]), b"k").unwrap_err();
    assert!(matches!(err, BucketKvError::PathNotFound));
}

#[test]
fn test_key_operations_with_empty_path() {
    let (_temp, service) = setup_service();

    let err = service.set_key(&[], b"k", b"v").unwrap_err();
    assert!(matches!(err, BucketKvError::PathNotFound));

    let err = service.get_key(&[], b"k").unwrap_err();
    assert!(matches!(err, BucketKvError::PathNotFound));

    let err = service.delete(&[], b"k").unwrap_err();
    assert!(matches!(err, BucketKvError::PathNotFound));
}

#[test]
fn test_deeply_nested_round_trip() {
    let (_temp, service) = setup_service();

    let names = ["l0", "l1", "l2", "l3", "l4", "l5"];
    for depth in 0..names.len() {
        service.create_bucket(&path(&names[..depth]), names[depth].as_bytes()).unwrap();
    }

    service.set_key(&path(&names), b"deep", b"value").unwrap();
    assert_eq!(service.get_key(&path(&names), b"deep").unwrap(), b"value");
}

#[test]
fn test_same_key_in_sibling_buckets() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"x").unwrap();
    service.create_bucket(&[], b"y").unwrap();
    service.set_key(&path(&["x"]), b"key", b"from-x").unwrap();
    service.set_key(&path(&["y"]), b"key", b"from-y").unwrap();

    assert_eq!(service.get_key(&path(&["x"]), b"key").unwrap(), b"from-x");
    assert_eq!(service.get_key(&path(&["y"]), b"key").unwrap(), b"from-y");
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_key() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"test").unwrap();
    service.set_key(&path(&["test"]), b"key", b"value").unwrap();
    service.delete(&path(&["test"]), b"key").unwrap();

    let err = service.get_key(&path(&["test"]), b"key").unwrap_err();
    assert!(matches!(err, BucketKvError::KeyNotFound));
}

#[test]
fn test_delete_absent_key_is_not_an_error() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"test").unwrap();
    service.delete(&path(&["test"]), b"absent").unwrap();

    let err = service.get_key(&path(&["test"]), b"absent").unwrap_err();
    assert!(matches!(err, BucketKvError::KeyNotFound));
}

#[test]
fn test_delete_in_missing_bucket() {
    let (_temp, service) = setup_service();

    let err = service.delete(&path(&["nope"]), b"key").unwrap_err();
    assert!(matches!(err, BucketKvError::PathNotFound));
}

// =============================================================================
// DeleteBucket Tests
// =============================================================================

#[test]
fn test_nested_scenario() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"a").unwrap();
    service.create_bucket(&path(&["a"]), b"b").unwrap();
    service.set_key(&path(&["a", "b"]), b"nested", b"nestedvalue").unwrap();

    assert_eq!(
        service.get_key(&path(&["a", "b"]), b"nested").unwrap(),
        b"nestedvalue"
    );

    service.delete_bucket(&path(&["a"]), b"b").unwrap();

    let err = service.get_key(&path(&["a", "b"]), b"nested").unwrap_err();
    assert!(matches!(err, BucketKvError::PathNotFound));
}

#[test]
fn test_delete_bucket_removes_subtree() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"a").unwrap();
    service.create_bucket(&path(&["a"]), b"b").unwrap();
    service.create_bucket(&path(&["a", "b"]), b"c").unwrap();
    service.set_key(&path(&["a", "b", "c"]), b"k", b"v").unwrap();

    service.delete_bucket(&path(&["a"]), b"b").unwrap();

    for p in [path(&["a", "b"]), path(&["a", "b", "c"])] {
        let err = service.get_key(&p, b"k").unwrap_err();
        assert!(matches!(err, BucketKvError::PathNotFound));
        let err = service.set_key(&p, b"k", b"v").unwrap_err();
        assert!(matches!(err, BucketKvError::PathNotFound));
    }

    // Re-created bucket starts empty
    service.create_bucket(&path(&["a"]), b"b").unwrap();
    let err = service.create_bucket(&path(&["a", "b", "c"]), b"d").unwrap_err();
    assert!(matches!(err, BucketKvError::PathNotFound));
}

#[test]
fn test_delete_root_bucket_with_empty_path() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"a").unwrap();
    service.create_bucket(&path(&["a"]), b"b").unwrap();
    service.create_bucket(&[], b"other").unwrap();

    service.delete_bucket(&[], b"a").unwrap();

    let err = service.get_key(&path(&["a", "b"]), b"k").unwrap_err();
    assert!(matches!(err, BucketKvError::PathNotFound));

    // Siblings are untouched
    service.set_key(&path(&["other"]), b"k", b"v").unwrap();
}

#[test]
fn test_delete_nonexistent_bucket_message() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"a").unwrap();

    let err = service.delete_bucket(&path(&["a"]), b"ghost").unwrap_err();
    assert!(matches!(err, BucketKvError::BucketNotFound));
    assert_eq!(err.to_string(), "bucket not found");
    assert_eq!(err.kind(), ErrorKind::BucketNotFound);

    let err = service.delete_bucket(&[], b"ghost").unwrap_err();
    assert_eq!(err.to_string(), "bucket not found");
}

#[test]
fn test_delete_bucket_under_missing_parent_message() {
    let (_temp, service) = setup_service();

    let err = service.delete_bucket(&path(&["missing"]), b"b").unwrap_err();
    assert_eq!(err.to_string(), "Bucket not Found");
}

#[test]
fn test_delete_bucket_on_plain_key() {
    let (_temp, service) = setup_service();

    service.create_bucket(&[], b"a").unwrap();
    service.set_key(&path(&["a"]), b"k", b"v").unwrap();

    let err = service.delete_bucket(&path(&["a"]), b"k").unwrap_err();
    assert!(matches!(err, BucketKvError::IncompatibleValue));

    // Failed operation rolled back; key intact
    assert_eq!(service.get_key(&path(&["a"]), b"k").unwrap(), b"v");
}

// =============================================================================
// Execute / Response Tests
// =============================================================================

#[test]
fn test_execute_renders_responses() {
    let (_temp, service) = setup_service();

    let create = Query::new(Vec::<&[u8]>::new()).key("test");
    let response = service.execute(&Request::new(Method::CreateBucket, create));
    assert!(response.is_ok());
    assert_eq!(response.value, None);

    let response = service.execute(&Request::new(
        Method::SetKey,
        Query::new(["test"]).key("hola").value("mon"),
    ));
    assert!(response.is_ok());

    let response =
        service.execute(&Request::new(Method::GetKey, Query::new(["test"]).key("hola")));
    assert_eq!(response.error, "");
    assert_eq!(response.value, Some(b"mon".to_vec()));
}

#[test]
fn test_execute_error_has_no_value() {
    let (_temp, service) = setup_service();

    let response = service.execute(&Request::new(Method::GetKey, Query::new(["a"]).key("k")));
    assert_eq!(response.error, "Bucket not Found");
    assert_eq!(response.value, None);

    service.create_bucket(&[], b"a").unwrap();
    let response = service.execute(&Request::new(Method::GetKey, Query::new(["a"]).key("k")));
    assert_eq!(response.error, "Key not Found");
    assert_eq!(response.value, None);
}

#[test]
fn test_execute_ping() {
    let (_temp, service) = setup_service();

    let response = service.execute(&Request::ping());
    assert_eq!(response.value, Some(b"PONG".to_vec()));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_and_readers() {
    let (_temp, service) = setup_service();

    for t in 0..4 {
        service.create_bucket(&[], format!("t{}", t).as_bytes()).unwrap();
    }

    thread::scope(|s| {
        for t in 0..4 {
            let service = service.clone();
            s.spawn(move || {
                let name = format!("t{}", t);
                let bucket = path(&[name.as_str()]);
                for i in 0..50 {
                    let key = format!("key{}", i);
                    service.set_key(&bucket, key.as_bytes(), b"value").unwrap();
                    assert_eq!(service.get_key(&bucket, key.as_bytes()).unwrap(), b"value");
                }
            });
        }
    });

    for t in 0..4 {
        let name = format!("t{}", t);
        let bucket = path(&[name.as_str()]);
        for i in 0..50 {
            let key = format!("key{}", i);
            assert_eq!(service.get_key(&bucket, key.as_bytes()).unwrap(), b"value");
        }
    }
}

use tempfile::tempdir;

use crate::constants::MAX_SERIALIZERS;
use crate::core::store::ShardedStore;
use crate::error::StoreError;

use super::store_builder;

#[test]
fn test_create_requires_files() {
    let builder = ShardedStore::builder();
    match builder.create() {
        Err(StoreError::NoFiles) => {}
        other => panic!("expected NoFiles, got {:?}", other),
    }
}

#[test]
fn test_create_rejects_too_many_files() {
    let dir = tempdir().unwrap();
    let builder = store_builder(&dir, MAX_SERIALIZERS + 1, 4);
    match builder.create() {
        Err(StoreError::TooManyFiles) => {}
        other => panic!("expected TooManyFiles, got {:?}", other),
    }
}

#[test]
fn test_create_rejects_zero_slices() {
    let dir = tempdir().unwrap();
    let builder = store_builder(&dir, 1, 0);
    match builder.create() {
        Err(StoreError::ZeroSlices) => {}
        other => panic!("expected ZeroSlices, got {:?}", other),
    }
}

#[test]
fn test_open_without_create_fails() {
    let dir = tempdir().unwrap();
    let builder = store_builder(&dir, 2, 4);
    assert!(builder.open().is_err());
}

#[test]
fn test_open_reads_slice_count_from_files() {
    let dir = tempdir().unwrap();
    let builder = store_builder(&dir, 2, 4);
    builder.create().unwrap();

    // The builder's n_slices is only used at format time
    let store = builder.clone().n_slices(16).open().unwrap();
    assert_eq!(store.n_slices(), 4);
    assert_eq!(store.n_files(), 2);
}

#[test]
fn test_check_existing_on_store_files() {
    let dir = tempdir().unwrap();
    let builder = store_builder(&dir, 2, 4);
    builder.create().unwrap();

    let files: Vec<_> = (0..2)
        .map(|i| dir.path().join(format!("data_{}.shard", i)))
        .collect();
    let mut verdict = None;
    ShardedStore::check_existing(&files, |ok| verdict = Some(ok));
    assert_eq!(verdict, Some(true));
}

#[test]
fn test_check_existing_fails_on_any_bad_file() {
    let dir = tempdir().unwrap();
    let builder = store_builder(&dir, 2, 4);
    builder.create().unwrap();

    let files = vec![
        dir.path().join("data_0.shard"),
        dir.path().join("never_created.shard"),
    ];
    let mut verdict = None;
    ShardedStore::check_existing(&files, |ok| verdict = Some(ok));
    assert_eq!(verdict, Some(false));
}

#[test]
fn test_single_file_store() {
    let dir = tempdir().unwrap();
    let store = super::new_store(&dir, 1, 4);
    assert_eq!(store.n_files(), 1);
    assert_eq!(store.n_slices(), 4);
}

#[test]
fn test_max_files_store() {
    let dir = tempdir().unwrap();
    let store = super::new_store(&dir, MAX_SERIALIZERS, 2);
    assert_eq!(store.n_files(), MAX_SERIALIZERS);
    assert_eq!(store.n_slices(), 2);
}

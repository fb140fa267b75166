use tempfile::tempdir;

use crate::constants::MAX_KEY_SIZE;
use crate::core::key::StoreKey;
use crate::core::mutation::Mutation;
use crate::core::ordering::OrderToken;
use crate::error::StoreError;

use super::{new_store, store_builder};

#[test]
fn test_meta_round_trip() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 4);

    assert_eq!(store.get_meta("absent").unwrap(), None);
    store.set_meta("greeting", b"hello").unwrap();
    assert_eq!(store.get_meta("greeting").unwrap().as_deref(), Some(&b"hello"[..]));

    // Overwrite-if-present
    store.set_meta("greeting", b"goodbye").unwrap();
    assert_eq!(
        store.get_meta("greeting").unwrap().as_deref(),
        Some(&b"goodbye"[..])
    );
}

#[test]
fn test_meta_values_may_be_arbitrary_bytes() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 2);

    let value: Vec<u8> = (0..=255).collect();
    store.set_meta("binary", &value).unwrap();
    assert_eq!(store.get_meta("binary").unwrap().as_deref(), Some(&value[..]));
}

#[test]
fn test_meta_key_length_boundary() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 2);

    let max_key = "m".repeat(MAX_KEY_SIZE);
    store.set_meta(&max_key, b"v").unwrap();
    assert_eq!(store.get_meta(&max_key).unwrap().as_deref(), Some(&b"v"[..]));

    let too_long = "m".repeat(MAX_KEY_SIZE + 1);
    match store.set_meta(&too_long, b"v") {
        Err(StoreError::InvalidKeySize) => {}
        other => panic!("expected InvalidKeySize, got {:?}", other),
    }
}

#[test]
fn test_meta_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let store = new_store(&dir, 2, 4);
        store.set_meta("persistent", b"yes").unwrap();
    }
    let store = store_builder(&dir, 2, 4).open().unwrap();
    assert_eq!(
        store.get_meta("persistent").unwrap().as_deref(),
        Some(&b"yes"[..])
    );
}

#[test]
fn test_meta_is_isolated_from_bulk_delete() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 4);

    store.set_meta("keepme", b"still here").unwrap();
    for i in 0..20u32 {
        let k = format!("data:{}", i);
        store.change(
            Mutation::set(StoreKey::new(k.as_bytes()).unwrap(), b"v", 0, 0),
            OrderToken::ignore(),
        );
    }

    store.delete_all_keys_for_backfill();

    // Data keys are gone from every slice
    for i in 0..20u32 {
        let k = format!("data:{}", i);
        assert_eq!(
            store
                .get(StoreKey::new(k.as_bytes()).unwrap(), OrderToken::ignore())
                .value,
            None
        );
    }
    // The metadata namespace is untouched
    assert_eq!(
        store.get_meta("keepme").unwrap().as_deref(),
        Some(&b"still here"[..])
    );
}

#[test]
fn test_meta_and_data_namespaces_are_disjoint() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 4);

    // The same name used as a data key and a metadata key must not
    // collide
    store.set_meta("shared-name", b"meta value").unwrap();
    store.change(
        Mutation::set(StoreKey::new(b"shared-name").unwrap(), b"data value", 0, 0),
        OrderToken::ignore(),
    );

    assert_eq!(
        store.get_meta("shared-name").unwrap().as_deref(),
        Some(&b"meta value"[..])
    );
    assert_eq!(
        store
            .get(StoreKey::new(b"shared-name").unwrap(), OrderToken::ignore())
            .value
            .as_deref(),
        Some(&b"data value"[..])
    );
}

use tempfile::tempdir;

use crate::constants::MAX_KEY_SIZE;
use crate::core::key::StoreKey;
use crate::core::mutation::{
    Castime, DeleteResult, Mutation, MutationResult, ReplTimestamp, SetResult,
};
use crate::core::ordering::{OrderSource, OrderToken};
use crate::error::StoreError;

use super::new_store;

fn key(k: &[u8]) -> StoreKey {
    StoreKey::new(k).unwrap()
}

#[test]
fn test_format_open_round_trip() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 2, 4);

    store.change(
        Mutation::set(key(b"apple"), b"A", 0, 0),
        OrderToken::ignore(),
    );
    store.change(
        Mutation::set(key(b"banana"), b"B", 0, 0),
        OrderToken::ignore(),
    );

    assert_eq!(
        store.get(key(b"apple"), OrderToken::ignore()).value.as_deref(),
        Some(&b"A"[..])
    );
    assert_eq!(
        store.get(key(b"banana"), OrderToken::ignore()).value.as_deref(),
        Some(&b"B"[..])
    );
    assert_eq!(store.get(key(b"cherry"), OrderToken::ignore()).value, None);
}

#[test]
fn test_data_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let store = new_store(&dir, 2, 4);
        for i in 0..50u32 {
            let k = format!("key:{:03}", i);
            let v = format!("value {}", i);
            let result = store.change(
                Mutation::set(key(k.as_bytes()), v.as_bytes(), 0, 0),
                OrderToken::ignore(),
            );
            assert_eq!(result, MutationResult::Set(SetResult::Stored));
        }
    }
    let store = super::store_builder(&dir, 2, 4).open().unwrap();
    for i in 0..50u32 {
        let k = format!("key:{:03}", i);
        let v = format!("value {}", i);
        assert_eq!(
            store
                .get(key(k.as_bytes()), OrderToken::ignore())
                .value
                .as_deref(),
            Some(v.as_bytes())
        );
    }
}

#[test]
fn test_mutation_results_pass_through() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 2);

    assert_eq!(
        store.change(Mutation::add(key(b"k"), b"1", 0, 0), OrderToken::ignore()),
        MutationResult::Set(SetResult::Stored)
    );
    assert_eq!(
        store.change(Mutation::add(key(b"k"), b"2", 0, 0), OrderToken::ignore()),
        MutationResult::Set(SetResult::NotStored)
    );
    assert_eq!(
        store.change(Mutation::delete(key(b"k")), OrderToken::ignore()),
        MutationResult::Delete(DeleteResult::Deleted)
    );
    assert_eq!(
        store.change(Mutation::delete(key(b"k")), OrderToken::ignore()),
        MutationResult::Delete(DeleteResult::NotFound)
    );
}

#[test]
fn test_cas_ids_are_unique_and_increasing_per_key() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 4);

    store.change(Mutation::set(key(b"k"), b"v1", 0, 0), OrderToken::ignore());
    let first = store.get(key(b"k"), OrderToken::ignore()).cas;
    store.change(Mutation::set(key(b"k"), b"v2", 0, 0), OrderToken::ignore());
    let second = store.get(key(b"k"), OrderToken::ignore()).cas;
    assert!(second > first);

    // The CAS protocol works end to end through the coordinator
    assert_eq!(
        store.change(
            Mutation::cas(key(b"k"), b"v3", 0, 0, second),
            OrderToken::ignore()
        ),
        MutationResult::Set(SetResult::Stored)
    );
    assert_eq!(
        store.change(
            Mutation::cas(key(b"k"), b"v4", 0, 0, second),
            OrderToken::ignore()
        ),
        MutationResult::Set(SetResult::Exists)
    );
}

#[test]
fn test_change_with_castime_bypasses_timestamper() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 2);

    let castime = Castime {
        cas: 9999,
        timestamp: ReplTimestamp(77),
    };
    let result = store.change_with_castime(
        Mutation::set(key(b"replayed"), b"v", 0, 0),
        castime,
        OrderToken::ignore(),
    );
    assert_eq!(result, MutationResult::Set(SetResult::Stored));
    assert_eq!(store.get(key(b"replayed"), OrderToken::ignore()).cas, 9999);
}

#[test]
fn test_empty_key_round_trip() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 4);

    // The empty key hashes to 0 and routes to slice 0
    let empty = key(b"");
    assert_eq!(store.slice_num(&empty), 0);
    store.change(
        Mutation::set(empty.clone(), b"nothing", 0, 0),
        OrderToken::ignore(),
    );
    assert_eq!(
        store.get(empty, OrderToken::ignore()).value.as_deref(),
        Some(&b"nothing"[..])
    );
}

#[test]
fn test_key_size_boundary() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 4);

    let max_key = vec![b'k'; MAX_KEY_SIZE];
    let stored = store.change(
        Mutation::set(key(&max_key), b"v", 0, 0),
        OrderToken::ignore(),
    );
    assert_eq!(stored, MutationResult::Set(SetResult::Stored));
    assert_eq!(
        store.get(key(&max_key), OrderToken::ignore()).value.as_deref(),
        Some(&b"v"[..])
    );

    let too_long = vec![b'k'; MAX_KEY_SIZE + 1];
    match StoreKey::new(&too_long) {
        Err(StoreError::InvalidKeySize) => {}
        other => panic!("expected InvalidKeySize, got {:?}", other),
    }
}

#[test]
fn test_value_limit_through_coordinator() {
    let dir = tempdir().unwrap();
    let builder = super::store_builder(&dir, 1, 2).value_limit(16);
    builder.create().unwrap();
    let store = builder.open().unwrap();

    assert_eq!(
        store.change(
            Mutation::set(key(b"k"), vec![0u8; 17], 0, 0),
            OrderToken::ignore()
        ),
        MutationResult::Set(SetResult::TooLarge)
    );
}

#[test]
fn test_per_shard_fifo_tokens() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 4);
    let source = OrderSource::new();

    // Same key, same shard: tokens must check out in issue order
    let t1 = source.check_in();
    let t2 = source.check_in();
    store.change(Mutation::set(key(b"k"), b"v1", 0, 0), t1);
    store.change(Mutation::set(key(b"k"), b"v2", 0, 0), t2);
    assert_eq!(
        store.get(key(b"k"), OrderToken::ignore()).value.as_deref(),
        Some(&b"v2"[..])
    );
}

#[test]
fn test_stats_count_operations() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 2);

    store.change(Mutation::set(key(b"k"), b"v", 0, 0), OrderToken::ignore());
    store.get(key(b"k"), OrderToken::ignore());
    store.get(key(b"missing"), OrderToken::ignore());

    let stats = store.stats();
    assert_eq!(stats.total_changes, 1);
    assert_eq!(stats.total_gets, 2);
}

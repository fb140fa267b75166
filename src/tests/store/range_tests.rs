use tempfile::tempdir;

use crate::core::key::StoreKey;
use crate::core::mutation::{Mutation, RangeBound};
use crate::core::ordering::OrderToken;

use super::new_store;

fn key(k: &[u8]) -> StoreKey {
    StoreKey::new(k).unwrap()
}

fn collect_keys(
    store: &crate::core::store::ShardedStore,
    left_mode: RangeBound,
    left: &[u8],
    right_mode: RangeBound,
    right: &[u8],
) -> Vec<Vec<u8>> {
    store
        .rget(
            left_mode,
            key(left),
            right_mode,
            key(right),
            OrderToken::ignore(),
        )
        .map(|kv| kv.key.as_bytes().to_vec())
        .collect()
}

#[test]
fn test_cross_shard_scan_is_ascending() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 2, 4);

    for k in [b"a", b"b", b"c", b"d", b"e"] {
        store.change(Mutation::set(key(k), b"v", 0, 0), OrderToken::ignore());
    }

    // Whatever slices the keys landed on, the merge comes back sorted
    let keys = collect_keys(&store, RangeBound::Closed, b"a", RangeBound::Closed, b"e");
    assert_eq!(
        keys,
        vec![
            b"a".to_vec(),
            b"b".to_vec(),
            b"c".to_vec(),
            b"d".to_vec(),
            b"e".to_vec()
        ]
    );
}

#[test]
fn test_bound_modes() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 4);

    for k in [b"a", b"b", b"c", b"d", b"e"] {
        store.change(Mutation::set(key(k), b"v", 0, 0), OrderToken::ignore());
    }

    assert_eq!(
        collect_keys(&store, RangeBound::Open, b"a", RangeBound::Open, b"e"),
        vec![b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]
    );
    assert_eq!(
        collect_keys(&store, RangeBound::Closed, b"b", RangeBound::Open, b"d"),
        vec![b"b".to_vec(), b"c".to_vec()]
    );
    assert_eq!(
        collect_keys(&store, RangeBound::None, b"", RangeBound::None, b"").len(),
        5
    );
}

#[test]
fn test_empty_range() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 4);

    store.change(Mutation::set(key(b"a"), b"v", 0, 0), OrderToken::ignore());
    store.change(Mutation::set(key(b"z"), b"v", 0, 0), OrderToken::ignore());

    assert!(collect_keys(&store, RangeBound::Closed, b"m", RangeBound::Closed, b"p").is_empty());
    // Inverted bounds yield nothing rather than wrapping
    assert!(collect_keys(&store, RangeBound::Closed, b"z", RangeBound::Closed, b"a").is_empty());
}

#[test]
fn test_single_slice_stream_passes_through() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 1);

    for i in 0..10u32 {
        let k = format!("k{:02}", i);
        store.change(
            Mutation::set(key(k.as_bytes()), b"v", 0, 0),
            OrderToken::ignore(),
        );
    }

    let keys = collect_keys(&store, RangeBound::None, b"", RangeBound::None, b"");
    let expected: Vec<Vec<u8>> = (0..10u32)
        .map(|i| format!("k{:02}", i).into_bytes())
        .collect();
    assert_eq!(keys, expected);
}

#[test]
fn test_scan_larger_than_one_batch() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 2, 4);

    // Several pull batches per shard stream
    let n = 500u32;
    for i in 0..n {
        let k = format!("key:{:04}", i);
        store.change(
            Mutation::set(key(k.as_bytes()), k.as_bytes(), 0, 0),
            OrderToken::ignore(),
        );
    }

    let entries: Vec<_> = store
        .rget(
            RangeBound::None,
            key(b""),
            RangeBound::None,
            key(b""),
            OrderToken::ignore(),
        )
        .collect();
    assert_eq!(entries.len(), n as usize);
    for (i, kv) in entries.iter().enumerate() {
        let expected = format!("key:{:04}", i);
        assert_eq!(kv.key.as_bytes(), expected.as_bytes());
        assert_eq!(&kv.value[..], expected.as_bytes());
    }
}

#[test]
fn test_scan_values_and_flags_come_back() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 2);

    store.change(
        Mutation::set(key(b"flagged"), b"payload", 1234, 0),
        OrderToken::ignore(),
    );

    let entries: Vec<_> = store
        .rget(
            RangeBound::Closed,
            key(b"flagged"),
            RangeBound::Closed,
            key(b"flagged"),
            OrderToken::ignore(),
        )
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(&entries[0].value[..], b"payload");
    assert_eq!(entries[0].flags, 1234);
}

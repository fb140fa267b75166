use rand::Rng;
use tempfile::tempdir;

use crate::core::key::StoreKey;
use crate::core::mutation::Mutation;
use crate::core::ordering::OrderToken;
use crate::core::store::ShardedStore;

use super::new_store;

#[test]
fn test_every_key_lands_on_its_hash_slice() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 2, 4);
    let mut rng = rand::thread_rng();

    let mut keys = Vec::new();
    for _ in 0..1000 {
        let raw: [u8; 8] = rng.gen();
        keys.push(raw);
    }

    for raw in &keys {
        let key = StoreKey::new(raw).unwrap();
        store.change(Mutation::set(key, &raw[..], 0, 0), OrderToken::ignore());
    }

    for raw in &keys {
        let key = StoreKey::new(raw).unwrap();
        let expected = (ShardedStore::hash(&key) % 4) as usize;
        assert_eq!(store.slice_num(&key), expected);

        // Present on exactly the slice the hash names
        for slice in 0..4 {
            let found = store.shard(slice).btree().contains_key(&key);
            assert_eq!(found, slice == expected, "key {:?} slice {}", raw, slice);
        }
    }
}

#[test]
fn test_single_slice_routes_everything_to_slice_zero() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 2, 1);
    let mut rng = rand::thread_rng();

    for _ in 0..100 {
        let raw: [u8; 8] = rng.gen();
        let key = StoreKey::new(&raw).unwrap();
        assert_eq!(store.slice_num(&key), 0);
        store.change(Mutation::set(key.clone(), &raw[..], 0, 0), OrderToken::ignore());
        assert!(store.shard(0).btree().contains_key(&key));
    }
}

#[test]
fn test_metadata_keys_do_not_hash() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 4);

    store.set_meta("routing-check", b"here").unwrap();

    // The value lives on the metadata slice, not on any data slice
    let key = StoreKey::new(b"routing-check").unwrap();
    for slice in 0..4 {
        assert!(!store.shard(slice).btree().contains_key(&key));
    }
    assert!(store.metadata_shard().btree().contains_key(&key));
}

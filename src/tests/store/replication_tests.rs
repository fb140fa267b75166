use tempfile::tempdir;

use crate::core::mutation::ReplTimestamp;

use super::{new_store, store_builder};

#[test]
fn test_replication_metadata_round_trip() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 2, 4);

    store.set_replication_clock(ReplTimestamp(42)).unwrap();
    store.set_last_sync(ReplTimestamp(41)).unwrap();
    store.set_replication_master_id(7).unwrap();
    store.set_replication_slave_id(9).unwrap();

    assert_eq!(store.get_replication_clock(), ReplTimestamp(42));
    assert_eq!(store.get_last_sync(), ReplTimestamp(41));
    assert_eq!(store.get_replication_master_id(), 7);
    assert_eq!(store.get_replication_slave_id(), 9);
}

#[test]
fn test_replication_clock_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let store = new_store(&dir, 2, 4);
        store.set_replication_clock(ReplTimestamp(42)).unwrap();
    }
    let store = store_builder(&dir, 2, 4).open().unwrap();
    assert_eq!(store.get_replication_clock(), ReplTimestamp(42));
}

#[test]
fn test_replication_metadata_lives_on_slice_zero() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 4);

    store.set_replication_clock(ReplTimestamp(55)).unwrap();

    assert_eq!(
        store.shard(0).btree().get_replication_clock(),
        ReplTimestamp(55)
    );
    for slice in 1..4 {
        assert_eq!(
            store.shard(slice).btree().get_replication_clock(),
            ReplTimestamp(0)
        );
    }
}

#[test]
fn test_open_seeds_timestampers_from_the_clock() {
    let dir = tempdir().unwrap();
    {
        let store = new_store(&dir, 1, 4);
        store.set_replication_clock(ReplTimestamp(100)).unwrap();
    }
    let store = store_builder(&dir, 1, 4).open().unwrap();
    for slice in 0..4 {
        assert_eq!(
            store.shard(slice).timestamper().timestamp(),
            ReplTimestamp(100)
        );
    }
}

#[test]
fn test_cas_ids_do_not_repeat_across_reopens() {
    let dir = tempdir().unwrap();
    use crate::core::key::StoreKey;
    use crate::core::mutation::Mutation;
    use crate::core::ordering::OrderToken;

    let key = StoreKey::new(b"cas-key").unwrap();
    let first_cas;
    {
        let store = new_store(&dir, 1, 1);
        store.change(
            Mutation::set(key.clone(), b"v1", 0, 0),
            OrderToken::ignore(),
        );
        first_cas = store.get(key.clone(), OrderToken::ignore()).cas;
    }
    let store = store_builder(&dir, 1, 1).open().unwrap();
    store.change(
        Mutation::set(key.clone(), b"v2", 0, 0),
        OrderToken::ignore(),
    );
    let second_cas = store.get(key, OrderToken::ignore()).cas;
    assert!(second_cas > first_cas);
}

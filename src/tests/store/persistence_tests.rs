use std::thread;
use std::time::Duration;

use tempfile::tempdir;

use crate::constants::{STAT_META_PREFIX, STAT_PERSIST_FREQUENCY};
use crate::core::key::StoreKey;
use crate::core::mutation::Mutation;
use crate::core::ordering::OrderToken;

use super::{new_store, store_builder};

#[test]
fn test_flush_all_persists_without_drop() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 2, 4);

    for i in 0..30u32 {
        let k = format!("k{}", i);
        store.change(
            Mutation::set(StoreKey::new(k.as_bytes()).unwrap(), b"v", 0, 0),
            OrderToken::ignore(),
        );
    }
    store.flush_all().unwrap();

    // The files are complete even while the store is still open
    let files: Vec<_> = (0..2)
        .map(|i| dir.path().join(format!("data_{}.shard", i)))
        .collect();
    let mut verdict = None;
    crate::core::store::ShardedStore::check_existing(&files, |ok| verdict = Some(ok));
    assert_eq!(verdict, Some(true));
}

#[test]
fn test_persisted_stats_round_trip() {
    let dir = tempdir().unwrap();
    {
        let store = new_store(&dir, 1, 2);
        for _ in 0..5 {
            store.get(StoreKey::new(b"k").unwrap(), OrderToken::ignore());
        }
        store.change(
            Mutation::set(StoreKey::new(b"k").unwrap(), b"v", 0, 0),
            OrderToken::ignore(),
        );

        // Persist through the metadata facade, the same path the
        // background task takes
        store.stats.persist_all(&store.metadata_store()).unwrap();

        let raw = store
            .get_meta(&format!("{}total_gets", STAT_META_PREFIX))
            .unwrap()
            .expect("persisted counter");
        assert_eq!(&raw[..], b"5");
    }

    // Reopen restores the counters before counting anything new
    let store = store_builder(&dir, 1, 2).open().unwrap();
    let stats = store.stats();
    assert_eq!(stats.total_gets, 5);
    assert_eq!(stats.total_changes, 1);
}

#[test]
fn test_stat_task_persists_periodically() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 2);

    store.get(StoreKey::new(b"k").unwrap(), OrderToken::ignore());

    // Let the task tick at least once
    thread::sleep(STAT_PERSIST_FREQUENCY + Duration::from_millis(600));

    assert!(store.stats().stat_persist_runs >= 1);
    let raw = store
        .get_meta(&format!("{}total_gets", STAT_META_PREFIX))
        .unwrap()
        .expect("task persisted the counter");
    let persisted: u64 = std::str::from_utf8(&raw).unwrap().parse().unwrap();
    assert!(persisted >= 1);
}

#[test]
fn test_stat_task_stops_on_drop() {
    let dir = tempdir().unwrap();
    let store = new_store(&dir, 1, 2);
    // Dropping the store must join the task promptly rather than wait
    // out its full tick
    let started = std::time::Instant::now();
    drop(store);
    assert!(started.elapsed() < STAT_PERSIST_FREQUENCY);
}

#[test]
fn test_unpersist_happens_before_first_persist() {
    let dir = tempdir().unwrap();
    {
        let store = new_store(&dir, 1, 2);
        for _ in 0..7 {
            store.get(StoreKey::new(b"k").unwrap(), OrderToken::ignore());
        }
        store.stats.persist_all(&store.metadata_store()).unwrap();
    }

    // Immediately after reopen, before any task tick, the restored
    // counters are visible
    let store = store_builder(&dir, 1, 2).open().unwrap();
    assert_eq!(store.stats().total_gets, 7);
}

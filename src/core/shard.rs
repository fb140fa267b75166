//! One shard: a B-tree slice plus its dispatching store, timestamper,
//! order sink, and substore order source, pinned to a home worker
//! thread.
//!
//! Every public entry point hops to the home thread as its first action
//! and returns on the calling thread when the work is done, so all slice
//! access is serialized on one worker. The order sink then verifies that
//! callers really did hand operations over in token order.

use std::sync::Arc;

use crate::core::dispatch::DispatchingStore;
use crate::core::key::StoreKey;
use crate::core::mutation::{
    Castime, GetResult, KeyWithValue, Mutation, MutationResult, RangeBound, ReplTimestamp,
};
use crate::core::ordering::{OrderSink, OrderSource, OrderToken};
use crate::core::slice::{BtreeSlice, CacheConfig};
use crate::core::timestamper::Timestamper;
use crate::error::Result;
use crate::runtime::WorkerPool;
use crate::storage::multiplex::PseudoSerializer;

// The pieces that travel into home-thread closures
struct ShardInner {
    sink: OrderSink,
    substore_source: OrderSource,
    btree: Arc<BtreeSlice>,
    dispatch: Arc<DispatchingStore>,
    timestamper: Timestamper,
}

pub struct ShardStore {
    home_thread: usize,
    pool: Arc<WorkerPool>,
    inner: Arc<ShardInner>,
}

impl ShardStore {
    pub fn new(
        proxy: PseudoSerializer,
        cache_config: CacheConfig,
        delete_queue_limit: i64,
        pool: Arc<WorkerPool>,
        home_thread: usize,
    ) -> Result<ShardStore> {
        let btree = Arc::new(BtreeSlice::open(proxy, cache_config, delete_queue_limit)?);
        let dispatch = Arc::new(DispatchingStore::new(Arc::clone(&btree)));
        let timestamper = Timestamper::new(Arc::clone(&dispatch), btree.highest_cas() + 1);
        Ok(ShardStore {
            home_thread,
            pool,
            inner: Arc::new(ShardInner {
                sink: OrderSink::new(),
                substore_source: OrderSource::new(),
                btree,
                dispatch,
                timestamper,
            }),
        })
    }

    pub fn home_thread(&self) -> usize {
        self.home_thread
    }

    pub fn get(&self, key: StoreKey, token: OrderToken) -> GetResult {
        let inner = Arc::clone(&self.inner);
        self.pool.run_on(self.home_thread, move || {
            inner.sink.check_out(token);
            // Reads may reorder among themselves; each one takes a fresh
            // read-mode substore token.
            let subtoken = inner.substore_source.check_in().with_read_mode();
            inner.btree.get(&key, subtoken)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn rget(
        &self,
        left_mode: RangeBound,
        left_key: StoreKey,
        right_mode: RangeBound,
        right_key: StoreKey,
        token: OrderToken,
        limit: usize,
    ) -> Vec<KeyWithValue> {
        let inner = Arc::clone(&self.inner);
        self.pool.run_on(self.home_thread, move || {
            inner.sink.check_out(token);
            let subtoken = inner.substore_source.check_in().with_read_mode();
            inner
                .btree
                .rget(left_mode, &left_key, right_mode, &right_key, subtoken, limit)
        })
    }

    /// Mutation through the timestamper: strict FIFO within this shard.
    pub fn change(&self, m: Mutation, token: OrderToken) -> MutationResult {
        let inner = Arc::clone(&self.inner);
        self.pool.run_on(self.home_thread, move || {
            inner.sink.check_out(token);
            let subtoken = inner.substore_source.check_in();
            inner.timestamper.change(m, subtoken)
        })
    }

    /// Mutation whose castime was chosen upstream (replication replay);
    /// bypasses the timestamper.
    pub fn change_with_castime(
        &self,
        m: Mutation,
        castime: Castime,
        token: OrderToken,
    ) -> MutationResult {
        let inner = Arc::clone(&self.inner);
        self.pool.run_on(self.home_thread, move || {
            inner.sink.check_out(token);
            let subtoken = inner.substore_source.check_in();
            inner.dispatch.change(m, castime, subtoken)
        })
    }

    /// Seed or advance the timestamper clock, waiting until the shard's
    /// home thread has applied it. Mutations issued after this returns
    /// are stamped with the new clock.
    pub fn set_timestamp(&self, t: ReplTimestamp) {
        let inner = Arc::clone(&self.inner);
        self.pool.run_on(self.home_thread, move || {
            inner.timestamper.set_timestamp(t);
        })
    }

    pub fn delete_all_keys_for_backfill(&self) {
        let inner = Arc::clone(&self.inner);
        self.pool.run_on(self.home_thread, move || {
            inner.btree.delete_all_keys_for_backfill();
        })
    }

    pub fn flush(&self) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.pool
            .run_on(self.home_thread, move || inner.btree.flush())
    }

    // --- replication bookkeeping, forwarded on the home thread ---

    pub fn set_replication_clock(&self, t: ReplTimestamp) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.pool
            .run_on(self.home_thread, move || inner.btree.set_replication_clock(t))
    }

    pub fn get_replication_clock(&self) -> ReplTimestamp {
        let inner = Arc::clone(&self.inner);
        self.pool
            .run_on(self.home_thread, move || inner.btree.get_replication_clock())
    }

    pub fn set_last_sync(&self, t: ReplTimestamp) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.pool
            .run_on(self.home_thread, move || inner.btree.set_last_sync(t))
    }

    pub fn get_last_sync(&self) -> ReplTimestamp {
        let inner = Arc::clone(&self.inner);
        self.pool
            .run_on(self.home_thread, move || inner.btree.get_last_sync())
    }

    pub fn set_replication_master_id(&self, id: u32) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.pool.run_on(self.home_thread, move || {
            inner.btree.set_replication_master_id(id)
        })
    }

    pub fn get_replication_master_id(&self) -> u32 {
        let inner = Arc::clone(&self.inner);
        self.pool.run_on(self.home_thread, move || {
            inner.btree.get_replication_master_id()
        })
    }

    pub fn set_replication_slave_id(&self, id: u32) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.pool.run_on(self.home_thread, move || {
            inner.btree.set_replication_slave_id(id)
        })
    }

    pub fn get_replication_slave_id(&self) -> u32 {
        let inner = Arc::clone(&self.inner);
        self.pool.run_on(self.home_thread, move || {
            inner.btree.get_replication_slave_id()
        })
    }

    /// The underlying slice. Direct access skips the home-thread hop and
    /// the order sink; it exists for the coordinator's bring-up path and
    /// for tests.
    pub fn btree(&self) -> &Arc<BtreeSlice> {
        &self.inner.btree
    }

    /// The write fan-out seam, for registering replication sinks.
    pub fn dispatching_store(&self) -> &Arc<DispatchingStore> {
        &self.inner.dispatch
    }

    pub fn timestamper(&self) -> &Timestamper {
        &self.inner.timestamper
    }
}

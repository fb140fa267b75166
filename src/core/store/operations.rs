use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;

use crate::core::key::StoreKey;
use crate::core::mutation::{Castime, GetResult, Mutation, MutationResult, ReplTimestamp};
use crate::core::ordering::OrderToken;
use crate::error::Result;
use crate::utils::hash::superfast_hash;

use super::ShardedStore;

impl ShardedStore {
    /// Stable 32-bit hash of a key. Part of the on-disk contract: the
    /// slice a key was persisted into depends on it.
    pub fn hash(key: &StoreKey) -> u32 {
        superfast_hash(key.as_bytes())
    }

    /// The data slice `key` lives on.
    pub fn slice_num(&self, key: &StoreKey) -> usize {
        (Self::hash(key) % self.n_slices as u32) as usize
    }

    /// Point read.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use shardstore::{OrderToken, ShardedStore, StoreKey};
    ///
    /// # fn main() -> shardstore::Result<()> {
    /// # let store = ShardedStore::builder().file("data.shard").open()?;
    /// let key = StoreKey::new(b"user:1")?;
    /// let result = store.get(key, OrderToken::ignore());
    /// if let Some(value) = result.value {
    ///     println!("{} bytes", value.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn get(&self, key: StoreKey, token: OrderToken) -> GetResult {
        self.stats.total_gets.fetch_add(1, Ordering::Relaxed);
        self.shards[self.slice_num(&key)].get(key, token)
    }

    /// Apply a mutation, stamped by the owning shard's timestamper.
    pub fn change(&self, m: Mutation, token: OrderToken) -> MutationResult {
        self.stats.total_changes.fetch_add(1, Ordering::Relaxed);
        self.shards[self.slice_num(m.key())].change(m, token)
    }

    /// Apply a mutation whose castime was chosen upstream (replication
    /// replay); the timestamper is bypassed.
    pub fn change_with_castime(
        &self,
        m: Mutation,
        castime: Castime,
        token: OrderToken,
    ) -> MutationResult {
        self.stats.total_changes.fetch_add(1, Ordering::Relaxed);
        self.shards[self.slice_num(m.key())].change_with_castime(m, castime, token)
    }

    /// Drop every key from every data slice. The metadata slice is not
    /// touched.
    pub fn delete_all_keys_for_backfill(&self) {
        for shard in &self.shards {
            shard.delete_all_keys_for_backfill();
        }
    }

    /// Broadcast `t` to every data shard's timestamper, in parallel,
    /// and wait for all of them: mutations issued after this returns
    /// are stamped with a clock of at least `t`.
    pub fn set_timestampers(&self, t: ReplTimestamp) {
        let shards: Vec<Arc<_>> = self.shards.to_vec();
        self.pool.pmap(shards.len(), move |i| shards[i].set_timestamp(t));
    }

    // --- metadata namespace ---

    /// Read a metadata value. Metadata keys skip hashing and live on the
    /// dedicated metadata slice.
    pub fn get_meta(&self, key: &str) -> Result<Option<Bytes>> {
        self.metadata_store().get(key)
    }

    /// Write a metadata value with defaulted "set" semantics.
    pub fn set_meta(&self, key: &str, value: &[u8]) -> Result<()> {
        self.metadata_store().set(key, value)
    }

    // --- replication bookkeeping; slice 0 is the authoritative home ---

    pub fn set_replication_clock(&self, t: ReplTimestamp) -> Result<()> {
        self.shards[0].set_replication_clock(t)
    }

    pub fn get_replication_clock(&self) -> ReplTimestamp {
        self.shards[0].get_replication_clock()
    }

    pub fn set_last_sync(&self, t: ReplTimestamp) -> Result<()> {
        self.shards[0].set_last_sync(t)
    }

    pub fn get_last_sync(&self) -> ReplTimestamp {
        self.shards[0].get_last_sync()
    }

    pub fn set_replication_master_id(&self, id: u32) -> Result<()> {
        self.shards[0].set_replication_master_id(id)
    }

    pub fn get_replication_master_id(&self) -> u32 {
        self.shards[0].get_replication_master_id()
    }

    pub fn set_replication_slave_id(&self, id: u32) -> Result<()> {
        self.shards[0].set_replication_slave_id(id)
    }

    pub fn get_replication_slave_id(&self) -> u32 {
        self.shards[0].get_replication_slave_id()
    }
}

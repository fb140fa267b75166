//! One B-tree slice: an ordered key space persisted inside a single
//! pseudo-serializer.
//!
//! In memory the slice is a lock-free `SkipMap`; on disk it is a
//! superblock (logical block 0) plus a packed record stream. Mutations
//! mark the slice dirty, and crossing the partitioned
//! `flush_dirty_size` budget rewrites the stream. Replication-metadata
//! setters persist the superblock synchronously, so the replication
//! clock survives reopen without an explicit flush.

use crossbeam_skiplist::SkipMap;
use parking_lot::Mutex;
use std::ops::Bound;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::constants::*;
use crate::core::key::StoreKey;
use crate::core::mutation::{
    AddPolicy, AppendPrependResult, CasId, Castime, DataSource, DeleteResult, ExpTime, GetResult,
    IncrDecrResult, KeyWithValue, McFlags, Mutation, MutationResult, RangeBound, ReplTimestamp,
    ReplacePolicy, SetResult,
};
use crate::core::ordering::OrderToken;
use crate::core::record::Record;
use crate::error::Result;
use crate::storage::format::{decode_record, encode_record, encoded_record_len, SliceSuperblock};
use crate::storage::multiplex::PseudoSerializer;

/// Cache, dirty, and I/O budgets for one slice (or, before
/// partitioning, for the whole store).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub max_size: u64,
    pub max_dirty_size: u64,
    pub flush_dirty_size: u64,
    pub io_priority_reads: u32,
    pub io_priority_writes: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_size: DEFAULT_MAX_CACHE_SIZE,
            max_dirty_size: DEFAULT_MAX_DIRTY_SIZE,
            flush_dirty_size: DEFAULT_FLUSH_DIRTY_SIZE,
            io_priority_reads: DEFAULT_IO_PRIORITY_READS,
            io_priority_writes: DEFAULT_IO_PRIORITY_WRITES,
        }
    }
}

impl CacheConfig {
    /// Scale every budget by `share`, flooring, with a minimum of 1 so
    /// even a tiny share yields a viable configuration.
    pub fn partition(&self, share: f32) -> CacheConfig {
        fn scaled64(v: u64, share: f32) -> u64 {
            (((v as f64) * (share as f64)).floor() as u64).max(1)
        }
        fn scaled32(v: u32, share: f32) -> u32 {
            (((v as f64) * (share as f64)).floor() as u32).max(1)
        }
        CacheConfig {
            max_size: scaled64(self.max_size, share),
            max_dirty_size: scaled64(self.max_dirty_size, share),
            flush_dirty_size: scaled64(self.flush_dirty_size, share),
            io_priority_reads: scaled32(self.io_priority_reads, share),
            io_priority_writes: scaled32(self.io_priority_writes, share),
        }
    }
}

/// Delete-queue limits are scaled by the same shares, without flooring.
pub fn partition_delete_queue_limit(total: i64, share: f32) -> i64 {
    ((total as f64) * (share as f64)) as i64
}

/// Slice parameters fixed at format time.
#[derive(Debug, Clone)]
pub struct SliceStaticConfig {
    /// Largest value the slice will store; writes beyond it return
    /// `TooLarge`. Persisted in the superblock.
    pub value_limit: usize,
}

impl Default for SliceStaticConfig {
    fn default() -> Self {
        SliceStaticConfig {
            value_limit: DEFAULT_VALUE_LIMIT,
        }
    }
}

#[derive(Default)]
struct PersistedShape {
    record_count: u64,
    data_bytes: u64,
}

#[derive(Default)]
struct DeleteQueue {
    keys: Vec<StoreKey>,
    bytes: i64,
    overflowed: bool,
}

pub struct BtreeSlice {
    proxy: PseudoSerializer,
    tree: SkipMap<Vec<u8>, Record>,
    value_limit: usize,
    cache_config: CacheConfig,
    delete_queue_limit: i64,

    replication_clock: AtomicU32,
    last_sync: AtomicU32,
    replication_master_id: AtomicU32,
    replication_slave_id: AtomicU32,
    highest_cas: AtomicU64,

    dirty_bytes: AtomicU64,
    // Doubles as the flush lock: superblock writes always describe a
    // record stream that is actually on disk.
    persisted: Mutex<PersistedShape>,
    delete_queue: Mutex<DeleteQueue>,
}

impl BtreeSlice {
    /// Format `proxy` as an empty slice.
    pub fn create(proxy: &PseudoSerializer, static_config: &SliceStaticConfig) -> Result<()> {
        let sb = SliceSuperblock::empty(static_config.value_limit as u32);
        proxy.write_block(0, &sb.encode())?;
        proxy.flush()
    }

    /// Open an existing slice, replaying its record stream.
    pub fn open(
        proxy: PseudoSerializer,
        cache_config: CacheConfig,
        delete_queue_limit: i64,
    ) -> Result<BtreeSlice> {
        let sb = SliceSuperblock::decode(&proxy.read_block(0)?)?;

        let tree = SkipMap::new();
        let mut highest_cas = sb.highest_cas;
        if sb.data_bytes > 0 {
            let block_size = proxy.block_size();
            let n_blocks = (sb.data_bytes as usize).div_ceil(block_size);
            let mut data = Vec::with_capacity(n_blocks * block_size);
            for b in 0..n_blocks {
                data.extend_from_slice(&proxy.read_block(1 + b as u64)?);
            }
            data.truncate(sb.data_bytes as usize);

            let mut at = 0;
            for _ in 0..sb.record_count {
                let (key, record) = decode_record(&data, &mut at)?;
                highest_cas = highest_cas.max(record.cas);
                tree.insert(key, record);
            }
        }

        Ok(BtreeSlice {
            proxy,
            tree,
            value_limit: sb.value_limit as usize,
            cache_config,
            delete_queue_limit,
            replication_clock: AtomicU32::new(sb.replication_clock),
            last_sync: AtomicU32::new(sb.last_sync),
            replication_master_id: AtomicU32::new(sb.replication_master_id),
            replication_slave_id: AtomicU32::new(sb.replication_slave_id),
            highest_cas: AtomicU64::new(highest_cas),
            dirty_bytes: AtomicU64::new(0),
            persisted: Mutex::new(PersistedShape {
                record_count: sb.record_count,
                data_bytes: sb.data_bytes,
            }),
            delete_queue: Mutex::new(DeleteQueue::default()),
        })
    }

    pub fn get(&self, key: &StoreKey, _token: OrderToken) -> GetResult {
        match self.tree.get(key.as_bytes()) {
            Some(entry) => {
                let record = entry.value();
                GetResult {
                    value: Some(record.value.clone()),
                    flags: record.flags,
                    cas: record.cas,
                    not_allowed: false,
                }
            }
            None => GetResult::default(),
        }
    }

    /// In-order scan of up to `limit` entries inside the given bounds.
    pub fn rget(
        &self,
        left_mode: RangeBound,
        left_key: &StoreKey,
        right_mode: RangeBound,
        right_key: &StoreKey,
        _token: OrderToken,
        limit: usize,
    ) -> Vec<KeyWithValue> {
        let lo = match left_mode {
            RangeBound::Open => Bound::Excluded(left_key.as_bytes().to_vec()),
            RangeBound::Closed => Bound::Included(left_key.as_bytes().to_vec()),
            RangeBound::None => Bound::Unbounded,
        };
        let hi = match right_mode {
            RangeBound::Open => Bound::Excluded(right_key.as_bytes().to_vec()),
            RangeBound::Closed => Bound::Included(right_key.as_bytes().to_vec()),
            RangeBound::None => Bound::Unbounded,
        };

        let mut out = Vec::new();
        for entry in self.tree.range((lo, hi)) {
            if out.len() >= limit {
                break;
            }
            let record = entry.value();
            out.push(KeyWithValue {
                key: StoreKey::from_tree_key(entry.key()),
                value: record.value.clone(),
                flags: record.flags,
            });
        }
        out
    }

    /// Apply a mutation stamped with `castime`.
    pub fn change(&self, m: Mutation, castime: Castime, _token: OrderToken) -> MutationResult {
        self.highest_cas.fetch_max(castime.cas, Ordering::AcqRel);
        let result = match m {
            Mutation::Sarc {
                key,
                data,
                flags,
                exptime,
                add_policy,
                replace_policy,
                old_cas,
            } => MutationResult::Set(self.apply_sarc(
                key,
                data,
                flags,
                exptime,
                add_policy,
                replace_policy,
                old_cas,
                castime,
            )),
            Mutation::Delete { key } => MutationResult::Delete(self.apply_delete(&key)),
            Mutation::Incr { key, amount } => {
                MutationResult::IncrDecr(self.apply_incr_decr(&key, amount, true, castime))
            }
            Mutation::Decr { key, amount } => {
                MutationResult::IncrDecr(self.apply_incr_decr(&key, amount, false, castime))
            }
            Mutation::Append { key, data } => {
                MutationResult::AppendPrepend(self.apply_concat(&key, data, true, castime))
            }
            Mutation::Prepend { key, data } => {
                MutationResult::AppendPrepend(self.apply_concat(&key, data, false, castime))
            }
        };
        self.maybe_flush();
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_sarc(
        &self,
        key: StoreKey,
        data: DataSource,
        flags: McFlags,
        exptime: ExpTime,
        add_policy: AddPolicy,
        replace_policy: ReplacePolicy,
        old_cas: Option<CasId>,
        castime: Castime,
    ) -> SetResult {
        let existing_cas = self.tree.get(key.as_bytes()).map(|e| e.value().cas);
        match existing_cas {
            Some(stored_cas) => match replace_policy {
                ReplacePolicy::No => return SetResult::NotStored,
                ReplacePolicy::IfCasMatches if old_cas != Some(stored_cas) => {
                    return SetResult::Exists
                }
                _ => {}
            },
            None => match (add_policy, replace_policy) {
                (AddPolicy::No, ReplacePolicy::IfCasMatches) => return SetResult::NotFound,
                (AddPolicy::No, _) => return SetResult::NotStored,
                (AddPolicy::Yes, _) => {}
            },
        }

        if data.size() > self.value_limit {
            return SetResult::TooLarge;
        }
        let value = match data.fetch() {
            Ok(v) => v,
            Err(_) => return SetResult::DataProviderFailed,
        };
        if value.len() > self.value_limit {
            return SetResult::TooLarge;
        }

        let record = Record {
            value,
            flags,
            exptime,
            cas: castime.cas,
            timestamp: castime.timestamp,
        };
        self.note_dirty(record.encoded_len(key.len()));
        self.tree.insert(key.into_vec(), record);
        SetResult::Stored
    }

    fn apply_delete(&self, key: &StoreKey) -> DeleteResult {
        match self.tree.remove(key.as_bytes()) {
            Some(_) => {
                self.note_deleted_key(key);
                self.note_dirty(encoded_record_len(key.len(), 0));
                DeleteResult::Deleted
            }
            None => DeleteResult::NotFound,
        }
    }

    fn apply_incr_decr(
        &self,
        key: &StoreKey,
        amount: u64,
        incr: bool,
        castime: Castime,
    ) -> IncrDecrResult {
        let record = match self.tree.get(key.as_bytes()) {
            Some(entry) => entry.value().clone(),
            None => return IncrDecrResult::NotFound,
        };

        let old = match std::str::from_utf8(&record.value)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            Some(n) => n,
            None => return IncrDecrResult::NotNumeric,
        };
        // memcached semantics: incr wraps, decr floors at zero
        let new = if incr {
            old.wrapping_add(amount)
        } else {
            old.saturating_sub(amount)
        };

        let updated = Record {
            value: new.to_string().into_bytes().into(),
            flags: record.flags,
            exptime: record.exptime,
            cas: castime.cas,
            timestamp: castime.timestamp,
        };
        self.note_dirty(updated.encoded_len(key.len()));
        self.tree.insert(key.as_bytes().to_vec(), updated);
        IncrDecrResult::NewValue(new)
    }

    fn apply_concat(
        &self,
        key: &StoreKey,
        data: DataSource,
        append: bool,
        castime: Castime,
    ) -> AppendPrependResult {
        let record = match self.tree.get(key.as_bytes()) {
            Some(entry) => entry.value().clone(),
            None => return AppendPrependResult::NotFound,
        };

        if record.value.len() + data.size() > self.value_limit {
            return AppendPrependResult::TooLarge;
        }
        let extra = match data.fetch() {
            Ok(v) => v,
            Err(_) => return AppendPrependResult::DataProviderFailed,
        };
        if record.value.len() + extra.len() > self.value_limit {
            return AppendPrependResult::TooLarge;
        }

        let mut combined = Vec::with_capacity(record.value.len() + extra.len());
        if append {
            combined.extend_from_slice(&record.value);
            combined.extend_from_slice(&extra);
        } else {
            combined.extend_from_slice(&extra);
            combined.extend_from_slice(&record.value);
        }

        let updated = Record {
            value: combined.into(),
            flags: record.flags,
            exptime: record.exptime,
            cas: castime.cas,
            timestamp: castime.timestamp,
        };
        self.note_dirty(updated.encoded_len(key.len()));
        self.tree.insert(key.as_bytes().to_vec(), updated);
        AppendPrependResult::Success
    }

    /// Drop every key. The delete queue is reset too: after a bulk wipe
    /// a follower has to backfill from scratch anyway.
    pub fn delete_all_keys_for_backfill(&self) {
        let keys: Vec<Vec<u8>> = self.tree.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            self.tree.remove(&key);
        }
        {
            let mut q = self.delete_queue.lock();
            q.keys.clear();
            q.bytes = 0;
            q.overflowed = false;
        }
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "flush after bulk delete failed");
        }
    }

    // --- replication bookkeeping ---

    pub fn set_replication_clock(&self, t: ReplTimestamp) -> Result<()> {
        self.replication_clock.store(t.0, Ordering::Release);
        self.write_superblock()
    }

    pub fn get_replication_clock(&self) -> ReplTimestamp {
        ReplTimestamp(self.replication_clock.load(Ordering::Acquire))
    }

    pub fn set_last_sync(&self, t: ReplTimestamp) -> Result<()> {
        self.last_sync.store(t.0, Ordering::Release);
        self.write_superblock()
    }

    pub fn get_last_sync(&self) -> ReplTimestamp {
        ReplTimestamp(self.last_sync.load(Ordering::Acquire))
    }

    pub fn set_replication_master_id(&self, id: u32) -> Result<()> {
        self.replication_master_id.store(id, Ordering::Release);
        self.write_superblock()
    }

    pub fn get_replication_master_id(&self) -> u32 {
        self.replication_master_id.load(Ordering::Acquire)
    }

    pub fn set_replication_slave_id(&self, id: u32) -> Result<()> {
        self.replication_slave_id.store(id, Ordering::Release);
        self.write_superblock()
    }

    pub fn get_replication_slave_id(&self) -> u32 {
        self.replication_slave_id.load(Ordering::Acquire)
    }

    // --- delete queue ---

    /// Keys deleted since the last drain, or `None` if the queue
    /// overflowed its budget and was dropped (a consumer must then fall
    /// back to a full backfill).
    pub fn take_deleted_keys(&self) -> Option<Vec<StoreKey>> {
        let mut q = self.delete_queue.lock();
        q.bytes = 0;
        if q.overflowed {
            q.overflowed = false;
            q.keys.clear();
            return None;
        }
        Some(std::mem::take(&mut q.keys))
    }

    fn note_deleted_key(&self, key: &StoreKey) {
        let mut q = self.delete_queue.lock();
        if q.overflowed {
            return;
        }
        q.bytes += encoded_record_len(key.len(), 0) as i64;
        if q.bytes > self.delete_queue_limit {
            q.keys.clear();
            q.bytes = 0;
            q.overflowed = true;
            return;
        }
        q.keys.push(key.clone());
    }

    // --- persistence ---

    /// Rewrite the record stream and superblock.
    pub fn flush(&self) -> Result<()> {
        let mut shape = self.persisted.lock();

        let mut data = Vec::new();
        let mut count = 0u64;
        for entry in self.tree.iter() {
            encode_record(entry.key(), entry.value(), &mut data);
            count += 1;
        }

        let block_size = self.proxy.block_size();
        for (i, chunk) in data.chunks(block_size).enumerate() {
            self.proxy.write_block(1 + i as u64, chunk)?;
        }

        shape.record_count = count;
        shape.data_bytes = data.len() as u64;
        self.write_superblock_locked(&shape)?;
        self.dirty_bytes.store(0, Ordering::Release);
        Ok(())
    }

    fn write_superblock(&self) -> Result<()> {
        let shape = self.persisted.lock();
        self.write_superblock_locked(&shape)
    }

    fn write_superblock_locked(&self, shape: &PersistedShape) -> Result<()> {
        let sb = SliceSuperblock {
            value_limit: self.value_limit as u32,
            replication_clock: self.replication_clock.load(Ordering::Acquire),
            last_sync: self.last_sync.load(Ordering::Acquire),
            replication_master_id: self.replication_master_id.load(Ordering::Acquire),
            replication_slave_id: self.replication_slave_id.load(Ordering::Acquire),
            highest_cas: self.highest_cas.load(Ordering::Acquire),
            record_count: shape.record_count,
            data_bytes: shape.data_bytes,
        };
        self.proxy.write_block(0, &sb.encode())?;
        self.proxy.flush()
    }

    fn note_dirty(&self, bytes: usize) {
        self.dirty_bytes.fetch_add(bytes as u64, Ordering::AcqRel);
    }

    fn maybe_flush(&self) {
        if self.dirty_bytes.load(Ordering::Acquire) >= self.cache_config.flush_dirty_size {
            if let Err(e) = self.flush() {
                tracing::warn!(error = %e, "slice flush failed; will retry on next write");
            }
        }
    }

    // --- introspection ---

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.len() == 0
    }

    pub fn contains_key(&self, key: &StoreKey) -> bool {
        self.tree.contains_key(key.as_bytes())
    }

    pub fn highest_cas(&self) -> CasId {
        self.highest_cas.load(Ordering::Acquire)
    }

    pub fn value_limit(&self) -> usize {
        self.value_limit
    }

    pub fn cache_config(&self) -> &CacheConfig {
        &self.cache_config
    }

    #[cfg(test)]
    pub(crate) fn record_timestamp(&self, key: &StoreKey) -> Option<ReplTimestamp> {
        self.tree.get(key.as_bytes()).map(|e| e.value().timestamp)
    }
}

impl Drop for BtreeSlice {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "final slice flush failed");
        }
    }
}

//! Cross-shard range scans.
//!
//! Each shard serves its stretch of the range as an in-order stream,
//! pulled lazily in batches of [`RGET_BATCH_SIZE`]; the coordinator
//! merges the streams with a small heap, popping whichever stream's
//! next key compares least. Ties cannot occur: every key belongs to
//! exactly one shard.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, VecDeque};
use std::cmp::Reverse;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::constants::RGET_BATCH_SIZE;
use crate::core::key::StoreKey;
use crate::core::mutation::{KeyWithValue, RangeBound};
use crate::core::ordering::OrderToken;
use crate::core::shard::ShardStore;

use super::ShardedStore;

impl ShardedStore {
    /// Range scan over every data slice, yielding entries in ascending
    /// key order.
    ///
    /// The iterator is lazy: shard streams are advanced in small batches
    /// as the caller consumes entries.
    pub fn rget(
        &self,
        left_mode: RangeBound,
        left_key: StoreKey,
        right_mode: RangeBound,
        right_key: StoreKey,
        token: OrderToken,
    ) -> RgetIterator {
        self.stats.total_rgets.fetch_add(1, Ordering::Relaxed);
        let streams = self
            .shards
            .iter()
            .map(|shard| {
                ShardRangeStream::new(
                    Arc::clone(shard),
                    left_mode,
                    left_key.clone(),
                    right_mode,
                    right_key.clone(),
                    token,
                )
            })
            .collect();
        RgetIterator::new(streams)
    }
}

/// Lazy, in-order stream of one shard's stretch of a range.
struct ShardRangeStream {
    shard: Arc<ShardStore>,
    left_mode: RangeBound,
    left_key: StoreKey,
    right_mode: RangeBound,
    right_key: StoreKey,
    /// Last key handed out; the next batch resumes just past it.
    cursor: Option<StoreKey>,
    /// Token for the first pull; later pulls are plain reads.
    first_token: Option<OrderToken>,
    buf: VecDeque<KeyWithValue>,
    exhausted: bool,
}

impl ShardRangeStream {
    fn new(
        shard: Arc<ShardStore>,
        left_mode: RangeBound,
        left_key: StoreKey,
        right_mode: RangeBound,
        right_key: StoreKey,
        token: OrderToken,
    ) -> ShardRangeStream {
        ShardRangeStream {
            shard,
            left_mode,
            left_key,
            right_mode,
            right_key,
            cursor: None,
            first_token: Some(token),
            buf: VecDeque::new(),
            exhausted: false,
        }
    }

    fn refill(&mut self) {
        let (left_mode, left_key) = match &self.cursor {
            Some(k) => (RangeBound::Open, k.clone()),
            None => (self.left_mode, self.left_key.clone()),
        };
        let token = self.first_token.take().unwrap_or_else(OrderToken::ignore);
        let batch = self.shard.rget(
            left_mode,
            left_key,
            self.right_mode,
            self.right_key.clone(),
            token,
            RGET_BATCH_SIZE,
        );
        if batch.len() < RGET_BATCH_SIZE {
            self.exhausted = true;
        }
        if let Some(last) = batch.last() {
            self.cursor = Some(last.key.clone());
        }
        self.buf.extend(batch);
    }
}

impl Iterator for ShardRangeStream {
    type Item = KeyWithValue;

    fn next(&mut self) -> Option<KeyWithValue> {
        if self.buf.is_empty() && !self.exhausted {
            self.refill();
        }
        self.buf.pop_front()
    }
}

struct HeapEntry {
    item: KeyWithValue,
    stream: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.item.key == other.item.key && self.stream == other.stream
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.item
            .key
            .cmp(&other.item.key)
            .then(self.stream.cmp(&other.stream))
    }
}

/// External merge of the per-shard ordered streams.
pub struct RgetIterator {
    streams: Vec<ShardRangeStream>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
}

impl RgetIterator {
    fn new(mut streams: Vec<ShardRangeStream>) -> RgetIterator {
        let mut heap = BinaryHeap::with_capacity(streams.len());
        for (i, stream) in streams.iter_mut().enumerate() {
            if let Some(item) = stream.next() {
                heap.push(Reverse(HeapEntry { item, stream: i }));
            }
        }
        RgetIterator { streams, heap }
    }
}

impl Iterator for RgetIterator {
    type Item = KeyWithValue;

    fn next(&mut self) -> Option<KeyWithValue> {
        let Reverse(HeapEntry { item, stream }) = self.heap.pop()?;
        if let Some(next) = self.streams[stream].next() {
            self.heap.push(Reverse(HeapEntry { item: next, stream }));
        }
        Some(item)
    }
}

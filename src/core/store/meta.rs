//! String-keyed metadata interface, backed by the dedicated metadata
//! shard. Keys never hash; values are written with defaulted "set"
//! semantics (no flags, never expires, no CAS) under
//! `OrderToken::ignore`.

use bytes::Bytes;
use std::sync::Arc;

use crate::core::key::StoreKey;
use crate::core::mutation::{Mutation, MutationResult, SetResult};
use crate::core::ordering::OrderToken;
use crate::core::shard::ShardStore;
use crate::error::{Result, StoreError};
use crate::stats::Statistics;

#[derive(Clone)]
pub struct MetadataStore {
    shard: Arc<ShardStore>,
    stats: Arc<Statistics>,
}

impl MetadataStore {
    pub(crate) fn new(shard: Arc<ShardStore>, stats: Arc<Statistics>) -> MetadataStore {
        MetadataStore { shard, stats }
    }

    pub fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.stats.meta_gets.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let sk = StoreKey::from_str_key(key)?;
        let res = self.shard.get(sk, OrderToken::ignore());
        // Nothing gates the metadata shard, so this can only trip if a
        // gated store was wired in by mistake.
        debug_assert!(!res.not_allowed);
        Ok(res.value)
    }

    pub fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.stats.meta_sets.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let sk = StoreKey::from_str_key(key)?;
        let m = Mutation::set(sk, value, 0, 0);
        match self.shard.change(m, OrderToken::ignore()) {
            MutationResult::Set(SetResult::Stored) => Ok(()),
            MutationResult::Set(SetResult::TooLarge) => Err(StoreError::ValueTooLarge),
            other => Err(StoreError::MetaSetFailed(other)),
        }
    }
}

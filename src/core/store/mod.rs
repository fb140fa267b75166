use std::sync::Arc;

use crate::core::shard::ShardStore;
use crate::runtime::WorkerPool;
use crate::stats::Statistics;
use crate::storage::multiplex::Multiplexer;
use crate::storage::serializer::Serializer;

// Re-export public types
pub use self::builder::{StoreBuilder, StoreDynamicConfig, StoreStaticConfig};
pub use self::range::RgetIterator;

// Module declarations
pub mod builder;
pub mod init;
pub mod meta;
pub mod operations;
pub mod persistence;
pub mod range;

use self::persistence::StatPersistTask;

/// Sharded, memcached-style key-value store.
///
/// One logical key space spread over `n_slices` on-disk B-tree slices,
/// which are themselves multiplexed over 1–32 backing files. Requests
/// route to a slice by a stable 32-bit hash of the key; each slice is
/// pinned to a home worker thread, serializes its operations through an
/// order sink, and stamps mutations through a timestamper. One extra
/// slice holds the string-keyed metadata namespace, and replication
/// bookkeeping always lives on slice 0.
///
/// Construct with [`StoreBuilder`]: `create()` formats the backing
/// files, `open()` serves an existing set.
pub struct ShardedStore {
    pub(crate) stats: Arc<Statistics>,
    pub(crate) stat_task: Option<StatPersistTask>,
    pub(crate) shards: Vec<Arc<ShardStore>>,
    pub(crate) metadata_shard: Option<Arc<ShardStore>>,
    pub(crate) n_slices: usize,
    pub(crate) multiplexer: Option<Multiplexer>,
    pub(crate) serializers: Vec<Arc<Serializer>>,
    // Declared last: the workers must outlive everything they host
    pub(crate) pool: Arc<WorkerPool>,
}

impl ShardedStore {
    /// Create a builder for configuring a store.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Number of data slices (the metadata slice is not counted).
    pub fn n_slices(&self) -> usize {
        self.n_slices
    }

    /// Number of backing files.
    pub fn n_files(&self) -> usize {
        self.serializers.len()
    }

    /// Point-in-time statistics.
    pub fn stats(&self) -> crate::stats::StatsSnapshot {
        self.stats.snapshot()
    }

    pub(crate) fn metadata_store(&self) -> meta::MetadataStore {
        let shard = self
            .metadata_shard
            .as_ref()
            .expect("metadata shard is alive until drop");
        meta::MetadataStore::new(Arc::clone(shard), Arc::clone(&self.stats))
    }

    #[cfg(test)]
    pub(crate) fn shard(&self, i: usize) -> &Arc<ShardStore> {
        &self.shards[i]
    }

    #[cfg(test)]
    pub(crate) fn metadata_shard(&self) -> &Arc<ShardStore> {
        self.metadata_shard.as_ref().unwrap()
    }
}

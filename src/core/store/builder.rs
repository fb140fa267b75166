use std::path::PathBuf;

use crate::constants::*;
use crate::core::slice::{CacheConfig, SliceStaticConfig};
use crate::error::Result;
use crate::storage::serializer::{
    SerializerConfig, SerializerPrivateConfig, SerializerStaticConfig,
};

use super::ShardedStore;

/// Settings fixed when the store is formatted. Changing any of them
/// rewrites the physical layout.
#[derive(Debug, Clone)]
pub struct StoreStaticConfig {
    /// Number of data slices. One extra slice is always added for the
    /// metadata namespace.
    pub n_slices: usize,
    pub serializer: SerializerStaticConfig,
    pub slice: SliceStaticConfig,
}

impl Default for StoreStaticConfig {
    fn default() -> Self {
        StoreStaticConfig {
            n_slices: DEFAULT_N_SLICES,
            serializer: SerializerStaticConfig::default(),
            slice: SliceStaticConfig::default(),
        }
    }
}

/// Settings chosen at every open.
#[derive(Debug, Clone)]
pub struct StoreDynamicConfig {
    pub serializer: SerializerConfig,
    /// One entry per backing file; the length is the file count.
    pub serializer_private: Vec<SerializerPrivateConfig>,
    /// Aggregate cache budgets, divided among the slices.
    pub cache: CacheConfig,
    /// Aggregate delete-queue budget, divided among the slices.
    pub total_delete_queue_limit: i64,
    pub num_worker_threads: usize,
}

impl Default for StoreDynamicConfig {
    fn default() -> Self {
        StoreDynamicConfig {
            serializer: SerializerConfig::default(),
            serializer_private: Vec::new(),
            cache: CacheConfig::default(),
            total_delete_queue_limit: DEFAULT_DELETE_QUEUE_LIMIT,
            num_worker_threads: num_cpus::get(),
        }
    }
}

/// Builder for creating or opening a [`ShardedStore`].
///
/// # Example
///
/// ```no_run
/// use shardstore::ShardedStore;
///
/// # fn main() -> shardstore::Result<()> {
/// let builder = ShardedStore::builder()
///     .file("data_0.shard")
///     .file("data_1.shard")
///     .n_slices(4);
/// builder.create()?;
/// let store = builder.open()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StoreBuilder {
    files: Vec<PathBuf>,
    n_slices: usize,
    cache: CacheConfig,
    total_delete_queue_limit: i64,
    num_worker_threads: usize,
    block_size: usize,
    value_limit: usize,
    fsync: bool,
}

impl StoreBuilder {
    pub fn new() -> StoreBuilder {
        StoreBuilder {
            files: Vec::new(),
            n_slices: DEFAULT_N_SLICES,
            cache: CacheConfig::default(),
            total_delete_queue_limit: DEFAULT_DELETE_QUEUE_LIMIT,
            num_worker_threads: num_cpus::get(),
            block_size: DEFAULT_BLOCK_SIZE,
            value_limit: DEFAULT_VALUE_LIMIT,
            fsync: true,
        }
    }

    /// Add one backing file. At least one is required; at most
    /// [`MAX_SERIALIZERS`] are supported.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Add several backing files at once.
    pub fn files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Number of data slices. Fixed at format time; `open` reads the
    /// count back from the files and ignores this value.
    pub fn n_slices(mut self, n: usize) -> Self {
        self.n_slices = n;
        self
    }

    /// Aggregate cache budgets, divided among the slices at open.
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Shorthand for setting the aggregate `max_size` budget.
    pub fn max_cache_size(mut self, bytes: u64) -> Self {
        self.cache.max_size = bytes;
        self
    }

    /// Aggregate dirty-byte budget a slice may accumulate before its
    /// share forces a flush.
    pub fn flush_dirty_size(mut self, bytes: u64) -> Self {
        self.cache.flush_dirty_size = bytes;
        self
    }

    /// Aggregate delete-queue budget, divided among the slices.
    pub fn delete_queue_limit(mut self, bytes: i64) -> Self {
        self.total_delete_queue_limit = bytes;
        self
    }

    /// Number of worker threads. Defaults to the CPU count.
    pub fn worker_threads(mut self, n: usize) -> Self {
        self.num_worker_threads = n.max(1);
        self
    }

    /// Block size of the backing files. Fixed at format time.
    pub fn block_size(mut self, bytes: usize) -> Self {
        self.block_size = bytes;
        self
    }

    /// Largest storable value. Fixed at format time.
    pub fn value_limit(mut self, bytes: usize) -> Self {
        self.value_limit = bytes;
        self
    }

    /// Whether flushes `sync_data` the backing files.
    pub fn fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    pub fn static_config(&self) -> StoreStaticConfig {
        StoreStaticConfig {
            n_slices: self.n_slices,
            serializer: SerializerStaticConfig {
                block_size: self.block_size,
            },
            slice: SliceStaticConfig {
                value_limit: self.value_limit,
            },
        }
    }

    pub fn dynamic_config(&self) -> StoreDynamicConfig {
        StoreDynamicConfig {
            serializer: SerializerConfig { fsync: self.fsync },
            serializer_private: self
                .files
                .iter()
                .map(|f| SerializerPrivateConfig::new(f.clone()))
                .collect(),
            cache: self.cache.clone(),
            total_delete_queue_limit: self.total_delete_queue_limit,
            num_worker_threads: self.num_worker_threads,
        }
    }

    /// Format the backing files: wipe them and lay down empty slices.
    pub fn create(&self) -> Result<()> {
        ShardedStore::create(&self.dynamic_config(), &self.static_config())
    }

    /// Open an existing store.
    pub fn open(&self) -> Result<ShardedStore> {
        ShardedStore::open(&self.dynamic_config())
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        StoreBuilder::new()
    }
}

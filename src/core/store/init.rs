//! Store bring-up: formatting, opening, and probing backing files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::constants::*;
use crate::core::shard::ShardStore;
use crate::core::slice::{partition_delete_queue_limit, BtreeSlice};
use crate::error::{Result, StoreError};
use crate::runtime::WorkerPool;
use crate::stats::Statistics;
use crate::storage::multiplex::Multiplexer;
use crate::storage::serializer::{Serializer, SerializerConfig, SerializerPrivateConfig};

use super::persistence::StatPersistTask;
use super::{ShardedStore, StoreDynamicConfig, StoreStaticConfig};

fn validate_file_count(n_files: usize) -> Result<()> {
    if n_files == 0 {
        return Err(StoreError::NoFiles);
    }
    if n_files > MAX_SERIALIZERS {
        return Err(StoreError::TooManyFiles);
    }
    Ok(())
}

fn open_serializers(
    pool: &Arc<WorkerPool>,
    dynamic: &SerializerConfig,
    privates: &[SerializerPrivateConfig],
) -> Result<Vec<Arc<Serializer>>> {
    let n = privates.len();
    let num_threads = pool.num_threads();
    let dynamic = dynamic.clone();
    let privates = privates.to_vec();
    pool.pmap(n, move |i| {
        Serializer::open(&dynamic, &privates[i], i % num_threads).map(Arc::new)
    })
    .into_iter()
    .collect()
}

impl ShardedStore {
    /// Format a store: wipe the backing files, lay out `n_slices + 1`
    /// logical slices over them, and initialize every slice as empty.
    pub fn create(
        dynamic_config: &StoreDynamicConfig,
        static_config: &StoreStaticConfig,
    ) -> Result<()> {
        let n_files = dynamic_config.serializer_private.len();
        validate_file_count(n_files)?;
        if static_config.n_slices == 0 {
            return Err(StoreError::ZeroSlices);
        }

        let pool = WorkerPool::new(dynamic_config.num_worker_threads);

        // Wipe the files and lay down empty serializers, in parallel
        {
            let ser = dynamic_config.serializer.clone();
            let privates = dynamic_config.serializer_private.clone();
            let ser_static = static_config.serializer.clone();
            let results = pool.pmap(n_files, move |i| {
                Serializer::create(&ser, &privates[i], &ser_static)
            });
            results.into_iter().collect::<Result<Vec<_>>>()?;
        }

        // Transient serializers so we can initialize their contents
        let serializers = open_serializers(
            &pool,
            &dynamic_config.serializer,
            &dynamic_config.serializer_private,
        )?;

        // One extra slice for the metadata namespace
        Multiplexer::create(&serializers, static_config.n_slices + 1)?;
        let multiplexer = Multiplexer::new(serializers.clone())?;

        // Initialize every slice as empty, in parallel
        {
            let proxies = multiplexer.proxies.clone();
            let slice_static = static_config.slice.clone();
            let results = pool.pmap(proxies.len(), move |i| {
                BtreeSlice::create(&proxies[i], &slice_static)
            });
            results.into_iter().collect::<Result<Vec<_>>>()?;
        }

        // Shut the transient serializers down
        drop(multiplexer);
        for s in &serializers {
            s.flush()?;
        }
        tracing::info!(
            n_files,
            n_slices = static_config.n_slices,
            "store formatted"
        );
        Ok(())
    }

    /// Open an existing store and bring every shard live.
    pub fn open(dynamic_config: &StoreDynamicConfig) -> Result<ShardedStore> {
        let n_files = dynamic_config.serializer_private.len();
        validate_file_count(n_files)?;

        let pool = WorkerPool::new(dynamic_config.num_worker_threads);

        let serializers = open_serializers(
            &pool,
            &dynamic_config.serializer,
            &dynamic_config.serializer_private,
        )?;
        let multiplexer = Multiplexer::new(serializers.clone())?;

        // The last proxy is the metadata slice
        let n_slices = multiplexer.n_proxies() - 1;
        if n_slices == 0 {
            return Err(StoreError::ZeroSlices);
        }

        // The metadata shard gets a fixed fraction of one data shard's
        // resources, bounded so the total stays inside the aggregate
        // budget.
        let resource_total = 1.0 + METADATA_SHARD_RESOURCE_QUOTIENT / n_slices as f32;
        let shard_share = 1.0 / (n_slices as f32 * resource_total);
        let metadata_share = METADATA_SHARD_RESOURCE_QUOTIENT / resource_total;

        let per_slice_cache = dynamic_config.cache.partition(shard_share);
        let metadata_cache = dynamic_config.cache.partition(metadata_share);
        let per_slice_delete_queue =
            partition_delete_queue_limit(dynamic_config.total_delete_queue_limit, shard_share);
        let metadata_delete_queue =
            partition_delete_queue_limit(dynamic_config.total_delete_queue_limit, metadata_share);

        // Load the data shards on their home threads, in parallel
        let shards: Vec<Arc<ShardStore>> = {
            let proxies = multiplexer.proxies.clone();
            let cache = per_slice_cache.clone();
            let shard_pool = Arc::clone(&pool);
            let num_threads = pool.num_threads();
            pool.pmap(n_slices, move |i| {
                ShardStore::new(
                    proxies[i].clone(),
                    cache.clone(),
                    per_slice_delete_queue,
                    Arc::clone(&shard_pool),
                    i % num_threads,
                )
                .map(Arc::new)
            })
            .into_iter()
            .collect::<Result<Vec<_>>>()?
        };

        // Load the metadata shard on its own home thread
        let metadata_shard = {
            let proxy = multiplexer.proxies[n_slices].clone();
            let shard_pool = Arc::clone(&pool);
            let home = n_slices % pool.num_threads();
            pool.run_on(home, move || {
                ShardStore::new(
                    proxy,
                    metadata_cache,
                    metadata_delete_queue,
                    shard_pool,
                    home,
                )
                .map(Arc::new)
            })?
        };

        let stats = Arc::new(Statistics::new());
        let mut store = ShardedStore {
            stats: Arc::clone(&stats),
            stat_task: None,
            shards,
            metadata_shard: Some(metadata_shard),
            n_slices,
            multiplexer: Some(multiplexer),
            serializers,
            pool,
        };

        // Seed the timestampers from the clock on disk
        let t = store.get_replication_clock();
        store.set_timestampers(t);

        // Restore persisted counters, then start the persistence task.
        // The restore has to finish first: the task's first tick would
        // otherwise overwrite unread state with fresh zeros.
        let meta = store.metadata_store();
        if let Err(e) = stats.unpersist_all(&meta) {
            tracing::warn!(error = %e, "failed to restore persisted stats");
        }
        store.stat_task = Some(StatPersistTask::start(stats, meta));

        tracing::info!(n_files, n_slices, "store opened");
        Ok(store)
    }

    /// Probe whether `filenames` already contain a store. Issues one
    /// asynchronous probe per file and invokes `callback` exactly once
    /// with the aggregate verdict: `true` only if every file checks out.
    pub fn check_existing<P: AsRef<Path>>(filenames: &[P], callback: impl FnOnce(bool)) {
        let files: Vec<PathBuf> = filenames.iter().map(|p| p.as_ref().to_path_buf()).collect();
        if files.is_empty() {
            callback(true);
            return;
        }
        let pool = WorkerPool::new(files.len().min(num_cpus::get()));
        let oks = pool.pmap(files.len(), move |i| Serializer::check_existing(&files[i]));
        callback(oks.into_iter().all(|ok| ok));
    }
}

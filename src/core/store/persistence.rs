//! Background stat persistence and orderly teardown.

use crossbeam_channel::{bounded, select, Sender};
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::constants::STAT_PERSIST_FREQUENCY;
use crate::core::shard::ShardStore;
use crate::error::Result;
use crate::stats::Statistics;

use super::meta::MetadataStore;
use super::ShardedStore;

/// Long-lived task that wakes every [`STAT_PERSIST_FREQUENCY`] and
/// flushes the persistent counters through the metadata shard. A
/// shutdown signal wakes it early and ends the loop; a signal that
/// arrives mid-persist is observed on the next iteration.
pub(crate) struct StatPersistTask {
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl StatPersistTask {
    pub(crate) fn start(stats: Arc<Statistics>, meta: MetadataStore) -> StatPersistTask {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let handle = std::thread::Builder::new()
            .name("stat-persist".into())
            .spawn(move || loop {
                select! {
                    recv(shutdown_rx) -> _ => break,
                    default(STAT_PERSIST_FREQUENCY) => {
                        match stats.persist_all(&meta) {
                            Ok(()) => {
                                stats.stat_persist_runs.fetch_add(1, Ordering::Relaxed);
                                tracing::debug!("persisted stats");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "stat persistence failed; retrying next tick");
                            }
                        }
                    }
                }
            })
            .expect("failed to spawn stat-persist thread");
        StatPersistTask {
            shutdown: shutdown_tx,
            handle: Some(handle),
        }
    }
}

impl Drop for StatPersistTask {
    fn drop(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl ShardedStore {
    /// Synchronously flush every slice and backing file.
    pub fn flush_all(&self) -> Result<()> {
        let shards = self.shards.to_vec();
        let results = self.pool.pmap(shards.len(), move |i| shards[i].flush());
        results.into_iter().collect::<Result<Vec<_>>>()?;

        if let Some(meta) = &self.metadata_shard {
            meta.flush()?;
        }
        for s in &self.serializers {
            s.flush()?;
        }
        Ok(())
    }
}

impl Drop for ShardedStore {
    fn drop(&mut self) {
        // Stop the stat task while the metadata shard is still alive
        self.stat_task.take();

        // Flush and drop the data shards on their home threads, in
        // parallel. Each slice writes its final snapshot in its Drop.
        let shards = std::mem::take(&mut self.shards);
        if !shards.is_empty() {
            let n = shards.len();
            let cells: Arc<Vec<Mutex<Option<Arc<ShardStore>>>>> =
                Arc::new(shards.into_iter().map(|s| Mutex::new(Some(s))).collect());
            self.pool.pmap(n, move |i| {
                cells[i].lock().take();
            });
        }

        // Then the metadata shard, on its home thread
        if let Some(meta) = self.metadata_shard.take() {
            let home = meta.home_thread();
            self.pool.run_on(home, move || drop(meta));
        }

        // Detach the pseudo-serializers before the files close
        self.multiplexer.take();

        // Flush and close the serializers on their home threads
        let serializers = std::mem::take(&mut self.serializers);
        if !serializers.is_empty() {
            let n = serializers.len();
            let cells: Arc<Vec<Mutex<Option<Arc<_>>>>> = Arc::new(
                serializers
                    .into_iter()
                    .map(|s| Mutex::new(Some(s)))
                    .collect(),
            );
            self.pool.pmap(n, move |i| {
                if let Some(s) = cells[i].lock().take() {
                    if let Err(e) = s.flush() {
                        tracing::warn!(error = %e, "serializer flush on close failed");
                    }
                }
            });
        }

        // The worker pool itself is joined by its own Drop
    }
}

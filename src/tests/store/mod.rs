// Coordinator-level tests

use tempfile::TempDir;

use crate::core::store::{ShardedStore, StoreBuilder};

#[cfg(test)]
pub mod builder_tests;

#[cfg(test)]
pub mod operations_tests;

#[cfg(test)]
pub mod distribution_tests;

#[cfg(test)]
pub mod range_tests;

#[cfg(test)]
pub mod replication_tests;

#[cfg(test)]
pub mod meta_tests;

#[cfg(test)]
pub mod persistence_tests;


pub(crate) fn store_builder(dir: &TempDir, n_files: usize, n_slices: usize) -> StoreBuilder {
    let files: Vec<_> = (0..n_files)
        .map(|i| dir.path().join(format!("data_{}.shard", i)))
        .collect();
    ShardedStore::builder()
        .files(files)
        .n_slices(n_slices)
        .worker_threads(4)
        .fsync(false)
}

pub(crate) fn new_store(dir: &TempDir, n_files: usize, n_slices: usize) -> ShardedStore {
    let builder = store_builder(dir, n_files, n_slices);
    builder.create().unwrap();
    builder.open().unwrap()
}

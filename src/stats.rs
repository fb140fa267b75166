//! Operation counters, with a small registry of counters that survive
//! restarts by round-tripping through the metadata shard.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::STAT_META_PREFIX;
use crate::core::store::meta::MetadataStore;
use crate::error::Result;

/// Central statistics hub for a store.
#[derive(Debug, Default)]
pub struct Statistics {
    // Persisted across restarts
    pub total_gets: AtomicU64,
    pub total_changes: AtomicU64,
    pub total_rgets: AtomicU64,

    // Runtime-only
    pub meta_gets: AtomicU64,
    pub meta_sets: AtomicU64,
    pub stat_persist_runs: AtomicU64,
}

impl Statistics {
    pub fn new() -> Statistics {
        Statistics::default()
    }

    /// The counters that persist across restarts, with the names they
    /// are stored under (prefixed with `stat_` in the metadata
    /// namespace).
    fn persistent_counters(&self) -> [(&'static str, &AtomicU64); 3] {
        [
            ("total_gets", &self.total_gets),
            ("total_changes", &self.total_changes),
            ("total_rgets", &self.total_rgets),
        ]
    }

    /// Write every persistent counter through the metadata shard.
    pub fn persist_all(&self, meta: &MetadataStore) -> Result<()> {
        for (name, counter) in self.persistent_counters() {
            let key = format!("{}{}", STAT_META_PREFIX, name);
            let value = counter.load(Ordering::Relaxed).to_string();
            meta.set(&key, value.as_bytes())?;
        }
        Ok(())
    }

    /// Restore every persistent counter from the metadata shard.
    /// Missing or unparsable values are skipped.
    pub fn unpersist_all(&self, meta: &MetadataStore) -> Result<()> {
        for (name, counter) in self.persistent_counters() {
            let key = format!("{}{}", STAT_META_PREFIX, name);
            if let Some(raw) = meta.get(&key)? {
                match std::str::from_utf8(&raw).ok().and_then(|s| s.parse::<u64>().ok()) {
                    Some(v) => counter.store(v, Ordering::Relaxed),
                    None => tracing::warn!(stat = name, "ignoring unparsable persisted stat"),
                }
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_gets: self.total_gets.load(Ordering::Relaxed),
            total_changes: self.total_changes.load(Ordering::Relaxed),
            total_rgets: self.total_rgets.load(Ordering::Relaxed),
            meta_gets: self.meta_gets.load(Ordering::Relaxed),
            meta_sets: self.meta_sets.load(Ordering::Relaxed),
            stat_persist_runs: self.stat_persist_runs.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_gets: u64,
    pub total_changes: u64,
    pub total_rgets: u64,
    pub meta_gets: u64,
    pub meta_sets: u64,
    pub stat_persist_runs: u64,
}

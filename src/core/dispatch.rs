use parking_lot::RwLock;
use std::sync::Arc;

use crate::core::mutation::{Castime, Mutation, MutationResult};
use crate::core::ordering::OrderToken;
use crate::core::slice::BtreeSlice;

/// Observer of a shard's write stream. Replication transports hang off
/// this seam; the store itself ships no transport.
pub trait ReplicationSink: Send + Sync {
    fn on_change(&self, mutation: &Mutation, castime: Castime);
}

/// Shard-local write fan-out: every stamped mutation is shown to the
/// registered sinks before it is applied to the slice.
pub struct DispatchingStore {
    btree: Arc<BtreeSlice>,
    sinks: RwLock<Vec<Arc<dyn ReplicationSink>>>,
}

impl DispatchingStore {
    pub fn new(btree: Arc<BtreeSlice>) -> DispatchingStore {
        DispatchingStore {
            btree,
            sinks: RwLock::new(Vec::new()),
        }
    }

    pub fn add_sink(&self, sink: Arc<dyn ReplicationSink>) {
        self.sinks.write().push(sink);
    }

    pub fn change(&self, m: Mutation, castime: Castime, token: OrderToken) -> MutationResult {
        for sink in self.sinks.read().iter() {
            sink.on_change(&m, castime);
        }
        self.btree.change(m, castime, token)
    }

    pub fn btree(&self) -> &Arc<BtreeSlice> {
        &self.btree
    }
}

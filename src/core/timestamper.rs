use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::dispatch::DispatchingStore;
use crate::core::mutation::{CasId, Castime, Mutation, MutationResult, ReplTimestamp};
use crate::core::ordering::OrderToken;

/// Stamps each incoming mutation with a fresh `Castime` read from a
/// monotonically non-decreasing clock, then hands it to the dispatching
/// store. The CAS counter is seeded past the highest CAS id the slice
/// has ever persisted, so ids never repeat across reopens.
pub struct Timestamper {
    dispatch: Arc<DispatchingStore>,
    clock: AtomicU32,
    next_cas: AtomicU64,
}

impl Timestamper {
    pub fn new(dispatch: Arc<DispatchingStore>, first_cas: CasId) -> Timestamper {
        Timestamper {
            dispatch,
            clock: AtomicU32::new(0),
            next_cas: AtomicU64::new(first_cas),
        }
    }

    pub fn change(&self, m: Mutation, token: OrderToken) -> MutationResult {
        let castime = Castime {
            cas: self.next_cas.fetch_add(1, Ordering::AcqRel),
            timestamp: ReplTimestamp(self.clock.load(Ordering::Acquire)),
        };
        self.dispatch.change(m, castime, token)
    }

    /// Seed or advance the clock. The clock never moves backward, and
    /// the new value is visible to every subsequent mutation on this
    /// shard.
    pub fn set_timestamp(&self, t: ReplTimestamp) {
        self.clock.fetch_max(t.0, Ordering::AcqRel);
    }

    pub fn timestamp(&self) -> ReplTimestamp {
        ReplTimestamp(self.clock.load(Ordering::Acquire))
    }
}

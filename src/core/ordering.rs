//! Order tokens.
//!
//! A source stamps each incoming operation with its position in a
//! logical order; a sink at the other end verifies that operations
//! arrive in that order. Write tokens are strictly serialized per
//! source; read-mode tokens may pass each other, but never a write that
//! was issued after them. `OrderToken::ignore()` opts out of the check.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderToken {
    source: u64,
    value: u64,
    read_mode: bool,
}

impl OrderToken {
    /// The sentinel token: sinks pass it through without any check.
    pub const fn ignore() -> OrderToken {
        OrderToken {
            source: 0,
            value: 0,
            read_mode: false,
        }
    }

    pub fn is_ignore(&self) -> bool {
        self.source == 0
    }

    pub fn is_read_mode(&self) -> bool {
        self.read_mode
    }

    pub fn with_read_mode(mut self) -> OrderToken {
        self.read_mode = true;
        self
    }
}

/// Issues tokens in checked-in order.
pub struct OrderSource {
    id: u64,
    counter: AtomicU64,
}

impl OrderSource {
    pub fn new() -> OrderSource {
        OrderSource {
            id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
            counter: AtomicU64::new(0),
        }
    }

    pub fn check_in(&self) -> OrderToken {
        OrderToken {
            source: self.id,
            value: self.counter.fetch_add(1, Ordering::Relaxed) + 1,
            read_mode: false,
        }
    }
}

impl Default for OrderSource {
    fn default() -> Self {
        OrderSource::new()
    }
}

#[derive(Default)]
struct SinkSlot {
    last_write: u64,
    last_read: u64,
}

/// Checks tokens out in the order their source issued them.
pub struct OrderSink {
    seen: Mutex<HashMap<u64, SinkSlot>>,
}

impl OrderSink {
    pub fn new() -> OrderSink {
        OrderSink {
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Verify that `token` arrives no earlier than everything its source
    /// issued before it. Panics on a violation; that is a bug in the
    /// caller's dispatch, not a runtime condition.
    pub fn check_out(&self, token: OrderToken) {
        if token.is_ignore() {
            return;
        }
        let mut seen = self.seen.lock();
        let slot = seen.entry(token.source).or_default();
        if token.read_mode {
            assert!(
                token.value > slot.last_write,
                "read-mode order token arrived before a write issued after it"
            );
            slot.last_read = slot.last_read.max(token.value);
        } else {
            assert!(
                token.value > slot.last_write && token.value > slot.last_read,
                "order token checked out of order"
            );
            slot.last_write = token.value;
        }
    }
}

impl Default for OrderSink {
    fn default() -> Self {
        OrderSink::new()
    }
}

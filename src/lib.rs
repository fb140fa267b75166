//! # ShardStore - Sharded Key-Value Store over Multiplexed Files
//!
// Copyright 2025 ShardStore Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! ShardStore spreads one memcached-style key space across N on-disk
//! slices layered over a fixed set of backing files, while preserving
//! per-key operation ordering, replication metadata, and a small
//! out-of-band metadata namespace.
//!
//! ## Architecture
//!
//! - **Routing**: a stable 32-bit hash (Paul Hsieh's SuperFastHash)
//!   maps every key to one of `n_slices` data slices. The hash is part
//!   of the on-disk contract.
//! - **Multiplexing**: 1-32 backing files are composed into
//!   `n_slices + 1` logical block namespaces; the extra slice holds the
//!   string-keyed metadata namespace.
//! - **Thread pinning**: every slice lives on a home worker thread.
//!   Public entry points hop there first, so slice access is serialized
//!   without shared-mutable state, and order sinks verify that callers
//!   hand operations over in token order.
//! - **Write stamping**: each shard's timestamper assigns a CAS id and
//!   repli-timestamp to every mutation; replicated writes carry their
//!   own castime and bypass it. Replication bookkeeping (clock, last
//!   sync, master/slave ids) always lives on slice 0.
//! - **Stat persistence**: a background task periodically writes the
//!   persistent operation counters into the metadata namespace and
//!   restores them at open.
//!
//! ## Quick start
//!
//! ```no_run
//! use shardstore::{Mutation, OrderToken, ShardedStore, StoreKey};
//!
//! # fn main() -> shardstore::Result<()> {
//! let builder = ShardedStore::builder()
//!     .file("data_0.shard")
//!     .file("data_1.shard")
//!     .n_slices(4);
//!
//! // Format once...
//! builder.create()?;
//!
//! // ...then serve.
//! let store = builder.open()?;
//! let key = StoreKey::new(b"fruit:1")?;
//! store.change(
//!     Mutation::set(key.clone(), &b"apple"[..], 0, 0),
//!     OrderToken::ignore(),
//! );
//! let result = store.get(key, OrderToken::ignore());
//! assert_eq!(result.value.as_deref(), Some(&b"apple"[..]));
//! # Ok(())
//! # }
//! ```
//!
//! ## Range scans
//!
//! ```no_run
//! use shardstore::{OrderToken, RangeBound, ShardedStore, StoreKey};
//!
//! # fn main() -> shardstore::Result<()> {
//! # let store = ShardedStore::builder().file("data.shard").open()?;
//! // Ascending over all slices, whatever shard each key landed on
//! let entries: Vec<_> = store
//!     .rget(
//!         RangeBound::Closed,
//!         StoreKey::new(b"a")?,
//!         RangeBound::Closed,
//!         StoreKey::new(b"z")?,
//!         OrderToken::ignore(),
//!     )
//!     .collect();
//! # Ok(())
//! # }
//! ```
//!
//! ## Ordering
//!
//! Callers that need per-key FIFO check tokens into an
//! [`OrderSource`] and pass them along;
//! within one shard, writes are applied strictly in token order, and no
//! read observes state older than any write checked in before it.
//! [`OrderToken::ignore()`] opts out.

pub mod constants;
pub mod core;
pub mod error;
pub mod runtime;
pub mod stats;
pub mod storage;
pub mod utils;

pub use crate::core::key::StoreKey;
pub use crate::core::mutation::{
    AddPolicy, AppendPrependResult, CasId, Castime, DataProvider, DataSource, DeleteResult,
    ExpTime, GetResult, IncrDecrResult, KeyWithValue, McFlags, Mutation, MutationResult,
    RangeBound, ReplTimestamp, ReplacePolicy, SetResult,
};
pub use crate::core::ordering::{OrderSink, OrderSource, OrderToken};
pub use crate::core::slice::{CacheConfig, SliceStaticConfig};
pub use crate::core::store::{
    RgetIterator, ShardedStore, StoreBuilder, StoreDynamicConfig, StoreStaticConfig,
};
pub use crate::error::{Result, StoreError};
pub use crate::stats::{Statistics, StatsSnapshot};

#[cfg(test)]
mod tests;

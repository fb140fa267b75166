//! Mutations, their result codes, and the castime pair that stamps
//! every write.

use bytes::Bytes;
use std::io;
use std::sync::Arc;

use crate::core::key::StoreKey;

pub type McFlags = u32;
pub type ExpTime = u32;
pub type CasId = u64;

/// Logical replication clock. 32-bit, monotonically non-decreasing,
/// persisted on slice 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ReplTimestamp(pub u32);

impl ReplTimestamp {
    pub const DISTANT_PAST: ReplTimestamp = ReplTimestamp(0);
}

/// CAS id + repli-timestamp attached to a write. Chosen by the shard's
/// timestamper, or supplied upstream when replaying replicated writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Castime {
    pub cas: CasId,
    pub timestamp: ReplTimestamp,
}

/// Supplies the bytes of a write on demand, so large values need not be
/// materialized until the destination slice accepts the operation.
pub trait DataProvider: Send + Sync {
    fn size(&self) -> usize;
    fn fetch(&self) -> io::Result<Bytes>;
}

/// The payload of a write: either already-buffered bytes or a fallible
/// provider. A failing provider surfaces as `DataProviderFailed`.
#[derive(Clone)]
pub enum DataSource {
    Buffered(Bytes),
    Provider(Arc<dyn DataProvider>),
}

impl DataSource {
    pub fn size(&self) -> usize {
        match self {
            DataSource::Buffered(b) => b.len(),
            DataSource::Provider(p) => p.size(),
        }
    }

    pub fn fetch(&self) -> io::Result<Bytes> {
        match self {
            DataSource::Buffered(b) => Ok(b.clone()),
            DataSource::Provider(p) => p.fetch(),
        }
    }
}

impl From<Bytes> for DataSource {
    fn from(b: Bytes) -> Self {
        DataSource::Buffered(b)
    }
}

impl From<&[u8]> for DataSource {
    fn from(b: &[u8]) -> Self {
        DataSource::Buffered(Bytes::copy_from_slice(b))
    }
}

impl<const N: usize> From<&[u8; N]> for DataSource {
    fn from(b: &[u8; N]) -> Self {
        DataSource::Buffered(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<u8>> for DataSource {
    fn from(b: Vec<u8>) -> Self {
        DataSource::Buffered(Bytes::from(b))
    }
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Buffered(b) => write!(f, "Buffered({} bytes)", b.len()),
            DataSource::Provider(p) => write!(f, "Provider({} bytes)", p.size()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPolicy {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacePolicy {
    Yes,
    No,
    IfCasMatches,
}

/// A tagged write. `Sarc` is the unified record write underlying
/// set/add/replace/cas, distinguished by its policies.
#[derive(Debug, Clone)]
pub enum Mutation {
    Sarc {
        key: StoreKey,
        data: DataSource,
        flags: McFlags,
        exptime: ExpTime,
        add_policy: AddPolicy,
        replace_policy: ReplacePolicy,
        old_cas: Option<CasId>,
    },
    Delete {
        key: StoreKey,
    },
    Incr {
        key: StoreKey,
        amount: u64,
    },
    Decr {
        key: StoreKey,
        amount: u64,
    },
    Append {
        key: StoreKey,
        data: DataSource,
    },
    Prepend {
        key: StoreKey,
        data: DataSource,
    },
}

impl Mutation {
    pub fn key(&self) -> &StoreKey {
        match self {
            Mutation::Sarc { key, .. }
            | Mutation::Delete { key }
            | Mutation::Incr { key, .. }
            | Mutation::Decr { key, .. }
            | Mutation::Append { key, .. }
            | Mutation::Prepend { key, .. } => key,
        }
    }

    /// Plain "set": insert if absent, overwrite if present, no CAS.
    pub fn set(key: StoreKey, data: impl Into<DataSource>, flags: McFlags, exptime: ExpTime) -> Mutation {
        Mutation::Sarc {
            key,
            data: data.into(),
            flags,
            exptime,
            add_policy: AddPolicy::Yes,
            replace_policy: ReplacePolicy::Yes,
            old_cas: None,
        }
    }

    /// "add": store only if the key is absent.
    pub fn add(key: StoreKey, data: impl Into<DataSource>, flags: McFlags, exptime: ExpTime) -> Mutation {
        Mutation::Sarc {
            key,
            data: data.into(),
            flags,
            exptime,
            add_policy: AddPolicy::Yes,
            replace_policy: ReplacePolicy::No,
            old_cas: None,
        }
    }

    /// "replace": store only if the key is present.
    pub fn replace(key: StoreKey, data: impl Into<DataSource>, flags: McFlags, exptime: ExpTime) -> Mutation {
        Mutation::Sarc {
            key,
            data: data.into(),
            flags,
            exptime,
            add_policy: AddPolicy::No,
            replace_policy: ReplacePolicy::Yes,
            old_cas: None,
        }
    }

    /// "cas": overwrite only if the stored CAS id still matches.
    pub fn cas(
        key: StoreKey,
        data: impl Into<DataSource>,
        flags: McFlags,
        exptime: ExpTime,
        old_cas: CasId,
    ) -> Mutation {
        Mutation::Sarc {
            key,
            data: data.into(),
            flags,
            exptime,
            add_policy: AddPolicy::No,
            replace_policy: ReplacePolicy::IfCasMatches,
            old_cas: Some(old_cas),
        }
    }

    pub fn delete(key: StoreKey) -> Mutation {
        Mutation::Delete { key }
    }

    pub fn incr(key: StoreKey, amount: u64) -> Mutation {
        Mutation::Incr { key, amount }
    }

    pub fn decr(key: StoreKey, amount: u64) -> Mutation {
        Mutation::Decr { key, amount }
    }

    pub fn append(key: StoreKey, data: impl Into<DataSource>) -> Mutation {
        Mutation::Append {
            key,
            data: data.into(),
        }
    }

    pub fn prepend(key: StoreKey, data: impl Into<DataSource>) -> Mutation {
        Mutation::Prepend {
            key,
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetResult {
    Stored,
    NotStored,
    /// CAS mismatch.
    Exists,
    NotFound,
    TooLarge,
    DataProviderFailed,
    NotAllowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResult {
    Deleted,
    NotFound,
    NotAllowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrDecrResult {
    NewValue(u64),
    NotFound,
    NotNumeric,
    NotAllowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendPrependResult {
    Success,
    NotFound,
    TooLarge,
    DataProviderFailed,
    NotAllowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationResult {
    Set(SetResult),
    Delete(DeleteResult),
    IncrDecr(IncrDecrResult),
    AppendPrepend(AppendPrependResult),
}

/// Result of a point read.
#[derive(Debug, Clone, Default)]
pub struct GetResult {
    pub value: Option<Bytes>,
    pub flags: McFlags,
    pub cas: CasId,
    /// Set when a gating layer above the store refused the read. The
    /// plain store never sets it.
    pub not_allowed: bool,
}

/// One entry of a range scan.
#[derive(Debug, Clone)]
pub struct KeyWithValue {
    pub key: StoreKey,
    pub value: Bytes,
    pub flags: McFlags,
}

/// Bound mode for one end of a range scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    /// Exclusive.
    Open,
    /// Inclusive.
    Closed,
    /// Unbounded; the key argument is ignored.
    None,
}

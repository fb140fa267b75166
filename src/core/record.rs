use bytes::Bytes;

use crate::core::mutation::{CasId, ExpTime, McFlags, ReplTimestamp};
use crate::storage::format::encoded_record_len;

/// One stored value with its memcached metadata. `Bytes` keeps clones
/// cheap; the slice hands these out without copying the payload.
#[derive(Debug, Clone)]
pub struct Record {
    pub value: Bytes,
    pub flags: McFlags,
    pub exptime: ExpTime,
    pub cas: CasId,
    pub timestamp: ReplTimestamp,
}

impl Record {
    pub fn encoded_len(&self, key_len: usize) -> usize {
        encoded_record_len(key_len, self.value.len())
    }
}

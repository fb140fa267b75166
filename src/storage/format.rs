//! On-disk encodings: the serializer file header, the per-slice
//! superblock, and the packed record stream.
//!
//! All integers are little-endian. Layout changes require bumping the
//! relevant version constant; old files are rejected, not migrated.

use bytes::Bytes;

use crate::constants::*;
use crate::core::mutation::ReplTimestamp;
use crate::core::record::Record;
use crate::error::{Result, StoreError};

/// Header block of every backing file (physical block 0).
///
/// `file_index`, `n_files`, and `n_proxies` are zero after `create` and
/// filled in when the multiplexer lays out the slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u32,
    pub block_size: u32,
    pub file_index: u32,
    pub n_files: u32,
    pub n_proxies: u32,
}

pub const FILE_HEADER_LEN: usize = 28;

impl FileHeader {
    pub fn new(block_size: u32) -> Self {
        FileHeader {
            version: SERIALIZER_VERSION,
            block_size,
            file_index: 0,
            n_files: 0,
            n_proxies: 0,
        }
    }

    pub fn is_multiplexed(&self) -> bool {
        self.n_proxies != 0
    }

    pub fn encode(&self) -> [u8; FILE_HEADER_LEN] {
        let mut buf = [0u8; FILE_HEADER_LEN];
        buf[0..8].copy_from_slice(SERIALIZER_MAGIC);
        buf[8..12].copy_from_slice(&self.version.to_le_bytes());
        buf[12..16].copy_from_slice(&self.block_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.file_index.to_le_bytes());
        buf[20..24].copy_from_slice(&self.n_files.to_le_bytes());
        buf[24..28].copy_from_slice(&self.n_proxies.to_le_bytes());
        buf
    }

    /// `None` when the magic does not match; `Err` only on a version we
    /// recognize as ours but cannot read.
    pub fn decode(buf: &[u8]) -> Option<FileHeader> {
        if buf.len() < FILE_HEADER_LEN || &buf[0..8] != SERIALIZER_MAGIC {
            return None;
        }
        Some(FileHeader {
            version: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            block_size: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            file_index: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
            n_files: u32::from_le_bytes(buf[20..24].try_into().unwrap()),
            n_proxies: u32::from_le_bytes(buf[24..28].try_into().unwrap()),
        })
    }
}

/// Superblock of a slice (logical block 0 of its pseudo-serializer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceSuperblock {
    pub value_limit: u32,
    pub replication_clock: u32,
    pub last_sync: u32,
    pub replication_master_id: u32,
    pub replication_slave_id: u32,
    pub highest_cas: u64,
    pub record_count: u64,
    pub data_bytes: u64,
}

pub const SLICE_SUPERBLOCK_LEN: usize = 52;

impl SliceSuperblock {
    pub fn empty(value_limit: u32) -> Self {
        SliceSuperblock {
            value_limit,
            replication_clock: 0,
            last_sync: 0,
            replication_master_id: 0,
            replication_slave_id: 0,
            highest_cas: 0,
            record_count: 0,
            data_bytes: 0,
        }
    }

    pub fn encode(&self) -> [u8; SLICE_SUPERBLOCK_LEN] {
        let mut buf = [0u8; SLICE_SUPERBLOCK_LEN];
        buf[0..4].copy_from_slice(&SLICE_MAGIC.to_le_bytes());
        buf[4..8].copy_from_slice(&SLICE_VERSION.to_le_bytes());
        buf[8..12].copy_from_slice(&self.value_limit.to_le_bytes());
        buf[12..16].copy_from_slice(&self.replication_clock.to_le_bytes());
        buf[16..20].copy_from_slice(&self.last_sync.to_le_bytes());
        buf[20..24].copy_from_slice(&self.replication_master_id.to_le_bytes());
        buf[24..28].copy_from_slice(&self.replication_slave_id.to_le_bytes());
        buf[28..36].copy_from_slice(&self.highest_cas.to_le_bytes());
        buf[36..44].copy_from_slice(&self.record_count.to_le_bytes());
        buf[44..52].copy_from_slice(&self.data_bytes.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<SliceSuperblock> {
        if buf.len() < SLICE_SUPERBLOCK_LEN {
            return Err(StoreError::CorruptedSuperblock);
        }
        let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let version = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        if magic != SLICE_MAGIC || version != SLICE_VERSION {
            return Err(StoreError::CorruptedSuperblock);
        }
        Ok(SliceSuperblock {
            value_limit: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            replication_clock: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            last_sync: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
            replication_master_id: u32::from_le_bytes(buf[20..24].try_into().unwrap()),
            replication_slave_id: u32::from_le_bytes(buf[24..28].try_into().unwrap()),
            highest_cas: u64::from_le_bytes(buf[28..36].try_into().unwrap()),
            record_count: u64::from_le_bytes(buf[36..44].try_into().unwrap()),
            data_bytes: u64::from_le_bytes(buf[44..52].try_into().unwrap()),
        })
    }
}

// Record stream entry:
//   [klen u16][flags u32][exptime u32][cas u64][timestamp u32][vlen u32][key][value]
const RECORD_HEADER_LEN: usize = 2 + 4 + 4 + 8 + 4 + 4;

pub fn encoded_record_len(key_len: usize, value_len: usize) -> usize {
    RECORD_HEADER_LEN + key_len + value_len
}

pub fn encode_record(key: &[u8], record: &Record, out: &mut Vec<u8>) {
    out.extend_from_slice(&(key.len() as u16).to_le_bytes());
    out.extend_from_slice(&record.flags.to_le_bytes());
    out.extend_from_slice(&record.exptime.to_le_bytes());
    out.extend_from_slice(&record.cas.to_le_bytes());
    out.extend_from_slice(&record.timestamp.0.to_le_bytes());
    out.extend_from_slice(&(record.value.len() as u32).to_le_bytes());
    out.extend_from_slice(key);
    out.extend_from_slice(&record.value);
}

pub fn decode_record(buf: &[u8], at: &mut usize) -> Result<(Vec<u8>, Record)> {
    let start = *at;
    if buf.len() < start + RECORD_HEADER_LEN {
        return Err(StoreError::CorruptedRecord);
    }
    let klen = u16::from_le_bytes(buf[start..start + 2].try_into().unwrap()) as usize;
    let flags = u32::from_le_bytes(buf[start + 2..start + 6].try_into().unwrap());
    let exptime = u32::from_le_bytes(buf[start + 6..start + 10].try_into().unwrap());
    let cas = u64::from_le_bytes(buf[start + 10..start + 18].try_into().unwrap());
    let timestamp = u32::from_le_bytes(buf[start + 18..start + 22].try_into().unwrap());
    let vlen = u32::from_le_bytes(buf[start + 22..start + 26].try_into().unwrap()) as usize;

    let key_at = start + RECORD_HEADER_LEN;
    if klen > MAX_KEY_SIZE || buf.len() < key_at + klen + vlen {
        return Err(StoreError::CorruptedRecord);
    }
    let key = buf[key_at..key_at + klen].to_vec();
    let value = Bytes::copy_from_slice(&buf[key_at + klen..key_at + klen + vlen]);
    *at = key_at + klen + vlen;

    Ok((
        key,
        Record {
            value,
            flags,
            exptime,
            cas,
            timestamp: ReplTimestamp(timestamp),
        },
    ))
}

use std::time::Duration;

// Size units
pub const KB: usize = 1024;
pub const MB: usize = 1024 * KB;

// Store keys follow the memcached limit. Empty keys are legal; they hash
// to 0 and route to slice 0.
pub const MAX_KEY_SIZE: usize = 250;
pub const DEFAULT_VALUE_LIMIT: usize = MB;

// Backing files and slices
pub const MAX_SERIALIZERS: usize = 32;
pub const DEFAULT_N_SLICES: usize = 8;

// Serializer file layout
pub const DEFAULT_BLOCK_SIZE: usize = 4096;
pub const MIN_BLOCK_SIZE: usize = 512;
pub const SERIALIZER_MAGIC: &[u8; 8] = b"SHRDSER\x01";
pub const SERIALIZER_VERSION: u32 = 1;

// Slice superblock (logical block 0 of every pseudo-serializer)
pub const SLICE_MAGIC: u32 = 0x534C_4943; // "SLIC"
pub const SLICE_VERSION: u32 = 1;

// Resource partitioning: the metadata shard gets this fraction of one
// data shard's budget, independent of the slice count.
pub const METADATA_SHARD_RESOURCE_QUOTIENT: f32 = 0.01;

// Aggregate cache defaults, divided among the slices at open
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 256 * MB as u64;
pub const DEFAULT_MAX_DIRTY_SIZE: u64 = 64 * MB as u64;
pub const DEFAULT_FLUSH_DIRTY_SIZE: u64 = 16 * MB as u64;
pub const DEFAULT_IO_PRIORITY_READS: u32 = 64;
pub const DEFAULT_IO_PRIORITY_WRITES: u32 = 64;
pub const DEFAULT_DELETE_QUEUE_LIMIT: i64 = 8 * MB as i64;

// Stat persistence
pub const STAT_PERSIST_FREQUENCY: Duration = Duration::from_millis(1000);
pub const STAT_META_PREFIX: &str = "stat_";

// Range scans pull per-shard results in batches of this many entries
pub const RGET_BATCH_SIZE: usize = 64;

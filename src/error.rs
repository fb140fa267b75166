use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(
        "Invalid key size: keys must be at most {} bytes",
        crate::constants::MAX_KEY_SIZE
    )]
    InvalidKeySize,

    #[error("No backing files configured")]
    NoFiles,

    #[error(
        "Too many backing files: at most {} are supported",
        crate::constants::MAX_SERIALIZERS
    )]
    TooManyFiles,

    #[error("Store must have at least one slice")]
    ZeroSlices,

    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),

    #[error("{path:?}: not a store file")]
    BadMagic { path: PathBuf },

    #[error("{path:?}: unsupported format version {found}")]
    VersionMismatch { path: PathBuf, found: u32 },

    #[error("{path:?}: file is not yet part of a multiplexed store")]
    NotMultiplexed { path: PathBuf },

    #[error("Backing files disagree about the store layout")]
    LayoutMismatch,

    #[error("Corrupted slice superblock")]
    CorruptedSuperblock,

    #[error("Corrupted record stream")]
    CorruptedRecord,

    #[error("Value exceeds the slice value limit")]
    ValueTooLarge,

    #[error("Metadata write was rejected: {0:?}")]
    MetaSetFailed(crate::core::mutation::MutationResult),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

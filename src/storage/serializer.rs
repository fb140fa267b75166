//! File-backed block serializer.
//!
//! One serializer owns one backing file. Physical block `b` lives at
//! byte offset `(1 + b) * block_size`; block offset 0 holds the file
//! header. Files grow lazily, and reads past the end of the file come
//! back zeroed.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{Result, StoreError};
use crate::storage::format::{FileHeader, FILE_HEADER_LEN};

/// Runtime settings shared by every backing file.
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// `sync_data` the file on every flush.
    pub fsync: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        SerializerConfig { fsync: true }
    }
}

/// Per-file settings.
#[derive(Debug, Clone)]
pub struct SerializerPrivateConfig {
    pub filename: PathBuf,
}

impl SerializerPrivateConfig {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        SerializerPrivateConfig {
            filename: filename.into(),
        }
    }
}

/// Settings fixed at format time and persisted in the file header.
#[derive(Debug, Clone)]
pub struct SerializerStaticConfig {
    pub block_size: usize,
}

impl Default for SerializerStaticConfig {
    fn default() -> Self {
        SerializerStaticConfig {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

pub struct Serializer {
    path: PathBuf,
    file: Mutex<File>,
    header: Mutex<FileHeader>,
    fsync: bool,
    home_thread: usize,
}

impl Serializer {
    /// Wipe the backing file and lay down an empty, un-multiplexed
    /// serializer.
    pub fn create(
        _dynamic: &SerializerConfig,
        private: &SerializerPrivateConfig,
        static_config: &SerializerStaticConfig,
    ) -> Result<()> {
        if static_config.block_size < MIN_BLOCK_SIZE
            || static_config.block_size < FILE_HEADER_LEN
        {
            return Err(StoreError::InvalidBlockSize(static_config.block_size));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&private.filename)?;

        let header = FileHeader::new(static_config.block_size as u32);
        let mut block = vec![0u8; static_config.block_size];
        block[..FILE_HEADER_LEN].copy_from_slice(&header.encode());
        file.write_all(&block)?;
        file.sync_data()?;
        Ok(())
    }

    /// Open an existing backing file, validating its header.
    pub fn open(
        dynamic: &SerializerConfig,
        private: &SerializerPrivateConfig,
        home_thread: usize,
    ) -> Result<Serializer> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&private.filename)?;

        let header = read_header(&mut file, &private.filename)?;

        Ok(Serializer {
            path: private.filename.clone(),
            file: Mutex::new(file),
            header: Mutex::new(header),
            fsync: dynamic.fsync,
            home_thread,
        })
    }

    /// Probe whether `path` looks like one of our backing files. Never
    /// fails; anything unreadable or unrecognized is `false`.
    pub fn check_existing(path: &Path) -> bool {
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(_) => return false,
        };
        read_header(&mut file, path).is_ok()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn home_thread(&self) -> usize {
        self.home_thread
    }

    pub fn block_size(&self) -> usize {
        self.header.lock().block_size as usize
    }

    pub fn header(&self) -> FileHeader {
        *self.header.lock()
    }

    /// Record the multiplexer layout in the file header.
    pub fn set_multiplex_layout(
        &self,
        file_index: u32,
        n_files: u32,
        n_proxies: u32,
    ) -> Result<()> {
        let mut header = self.header.lock();
        header.file_index = file_index;
        header.n_files = n_files;
        header.n_proxies = n_proxies;

        let block_size = header.block_size as usize;
        let mut block = vec![0u8; block_size];
        block[..FILE_HEADER_LEN].copy_from_slice(&header.encode());

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&block)?;
        file.sync_data()?;
        Ok(())
    }

    /// Read physical block `block`. Unwritten blocks come back zeroed.
    pub fn read_block(&self, block: u64) -> Result<Vec<u8>> {
        let block_size = self.block_size();
        let offset = (1 + block) * block_size as u64;

        let mut buf = vec![0u8; block_size];
        let mut file = self.file.lock();
        let len = file.metadata()?.len();
        if offset >= len {
            return Ok(buf);
        }
        file.seek(SeekFrom::Start(offset))?;
        let avail = ((len - offset) as usize).min(block_size);
        file.read_exact(&mut buf[..avail])?;
        Ok(buf)
    }

    /// Write physical block `block`. Short payloads are zero-padded to
    /// the block size; longer ones are a caller bug.
    pub fn write_block(&self, block: u64, data: &[u8]) -> Result<()> {
        let block_size = self.block_size();
        debug_assert!(data.len() <= block_size);
        let offset = (1 + block) * block_size as u64;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        if data.len() == block_size {
            file.write_all(data)?;
        } else {
            let mut padded = vec![0u8; block_size];
            padded[..data.len()].copy_from_slice(data);
            file.write_all(&padded)?;
        }
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        if self.fsync {
            self.file.lock().sync_data()?;
        }
        Ok(())
    }
}

fn read_header(file: &mut File, path: &Path) -> Result<FileHeader> {
    let mut buf = [0u8; FILE_HEADER_LEN];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut buf).map_err(|_| StoreError::BadMagic {
        path: path.to_path_buf(),
    })?;

    let header = FileHeader::decode(&buf).ok_or_else(|| StoreError::BadMagic {
        path: path.to_path_buf(),
    })?;
    if header.version != SERIALIZER_VERSION {
        return Err(StoreError::VersionMismatch {
            path: path.to_path_buf(),
            found: header.version,
        });
    }
    if (header.block_size as usize) < MIN_BLOCK_SIZE {
        return Err(StoreError::BadMagic {
            path: path.to_path_buf(),
        });
    }
    Ok(header)
}

//! Serializer multiplexer.
//!
//! Takes N physical file serializers and exposes M logical
//! pseudo-serializers, each an independent namespace of blocks. Proxy
//! `p` lives in file `p % n_files` at slot `p / n_files`; logical block
//! `L` of proxy `p` maps to physical block `L * stride + slot`, where
//! `stride` is the number of proxy slots per file. The layout is
//! recorded in every file header at `create` and cross-checked on every
//! open.

use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::storage::serializer::Serializer;

pub struct Multiplexer {
    serializers: Vec<Arc<Serializer>>,
    pub proxies: Vec<PseudoSerializer>,
}

impl Multiplexer {
    /// Lay out `n_proxies` logical slices over freshly formatted
    /// serializers, recording the layout in each file header.
    pub fn create(serializers: &[Arc<Serializer>], n_proxies: usize) -> Result<()> {
        let n_files = serializers.len();
        if n_files == 0 {
            return Err(StoreError::NoFiles);
        }
        if n_proxies == 0 {
            return Err(StoreError::ZeroSlices);
        }
        for (i, s) in serializers.iter().enumerate() {
            s.set_multiplex_layout(i as u32, n_files as u32, n_proxies as u32)?;
        }
        Ok(())
    }

    /// Attach to already-laid-out serializers. All files must agree on
    /// the layout and must be passed in their recorded order.
    pub fn new(serializers: Vec<Arc<Serializer>>) -> Result<Multiplexer> {
        let n_files = serializers.len();
        if n_files == 0 {
            return Err(StoreError::NoFiles);
        }

        let first = serializers[0].header();
        if !first.is_multiplexed() {
            return Err(StoreError::NotMultiplexed {
                path: serializers[0].path().to_path_buf(),
            });
        }

        for (i, s) in serializers.iter().enumerate() {
            let h = s.header();
            if !h.is_multiplexed() {
                return Err(StoreError::NotMultiplexed {
                    path: s.path().to_path_buf(),
                });
            }
            if h.n_files as usize != n_files
                || h.n_proxies != first.n_proxies
                || h.file_index as usize != i
                || h.block_size != first.block_size
            {
                return Err(StoreError::LayoutMismatch);
            }
        }

        let n_proxies = first.n_proxies as usize;
        let stride = n_proxies.div_ceil(n_files) as u64;
        let proxies = (0..n_proxies)
            .map(|p| PseudoSerializer {
                inner: Arc::clone(&serializers[p % n_files]),
                slot: (p / n_files) as u64,
                stride,
                proxy_index: p,
            })
            .collect();

        Ok(Multiplexer {
            serializers,
            proxies,
        })
    }

    pub fn n_proxies(&self) -> usize {
        self.proxies.len()
    }

    pub fn serializers(&self) -> &[Arc<Serializer>] {
        &self.serializers
    }
}

/// One logical slice of the multiplexer, addressable like a serializer.
/// Cheap to clone; views share the underlying file serializer.
#[derive(Clone)]
pub struct PseudoSerializer {
    inner: Arc<Serializer>,
    slot: u64,
    stride: u64,
    proxy_index: usize,
}

impl PseudoSerializer {
    pub fn proxy_index(&self) -> usize {
        self.proxy_index
    }

    pub fn block_size(&self) -> usize {
        self.inner.block_size()
    }

    pub fn home_thread(&self) -> usize {
        self.inner.home_thread()
    }

    pub fn read_block(&self, logical: u64) -> Result<Vec<u8>> {
        self.inner.read_block(logical * self.stride + self.slot)
    }

    pub fn write_block(&self, logical: u64, data: &[u8]) -> Result<()> {
        self.inner.write_block(logical * self.stride + self.slot, data)
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.flush()
    }
}

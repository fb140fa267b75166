use std::fmt;

use crate::constants::MAX_KEY_SIZE;
use crate::error::{Result, StoreError};

/// A store key: an opaque byte string of at most [`MAX_KEY_SIZE`] bytes.
/// The empty key is legal.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey(Vec<u8>);

impl StoreKey {
    pub fn new(bytes: &[u8]) -> Result<StoreKey> {
        if bytes.len() > MAX_KEY_SIZE {
            return Err(StoreError::InvalidKeySize);
        }
        Ok(StoreKey(bytes.to_vec()))
    }

    /// Build a key from a string, for the string-keyed metadata
    /// interface. Fails on over-long keys, same as [`StoreKey::new`].
    pub fn from_str_key(key: &str) -> Result<StoreKey> {
        StoreKey::new(key.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Rehydrate a key that is already stored in a slice tree, where the
    /// length invariant is known to hold.
    pub(crate) fn from_tree_key(bytes: &[u8]) -> StoreKey {
        debug_assert!(bytes.len() <= MAX_KEY_SIZE);
        StoreKey(bytes.to_vec())
    }
}

impl AsRef<[u8]> for StoreKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for StoreKey {
    type Error = StoreError;

    fn try_from(bytes: &[u8]) -> Result<StoreKey> {
        StoreKey::new(bytes)
    }
}

impl fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreKey({:?})", String::from_utf8_lossy(&self.0))
    }
}

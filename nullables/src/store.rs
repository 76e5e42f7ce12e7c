//! Nullable store: thread-safe in-memory block storage.

use meridian_store::{BlockStore, StoreError};
use meridian_types::Hash;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// An in-memory block store.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullStore {
    blocks: Mutex<HashMap<Hash, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            blocks: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `put_block` fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore for NullStore {
    fn put_block(&self, hash: &Hash, block_bytes: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store: writes disabled".into()));
        }
        self.blocks
            .lock()
            .unwrap()
            .insert(*hash, block_bytes.to_vec());
        Ok(())
    }

    fn get_block(&self, hash: &Hash) -> Result<Vec<u8>, StoreError> {
        self.blocks
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(hash.to_string()))
    }

    fn exists(&self, hash: &Hash) -> Result<bool, StoreError> {
        Ok(self.blocks.lock().unwrap().contains_key(hash))
    }

    fn block_count(&self) -> Result<u64, StoreError> {
        Ok(self.blocks.lock().unwrap().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_count() {
        let s = NullStore::new();
        let h = Hash::new([1; 32]);
        s.put_block(&h, b"abc").unwrap();
        assert_eq!(s.get_block(&h).unwrap(), b"abc");
        assert_eq!(s.block_count().unwrap(), 1);
    }

    #[test]
    fn forced_write_failure() {
        let s = NullStore::new();
        s.fail_writes(true);
        assert!(s.put_block(&Hash::new([1; 32]), b"x").is_err());
        assert!(!s.exists(&Hash::new([1; 32])).unwrap());
    }
}

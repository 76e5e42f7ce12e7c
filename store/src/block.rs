//! Block storage trait.

use crate::StoreError;
use meridian_types::Hash;

/// Content-addressed block storage: serialized blocks keyed by block hash.
///
/// Durability is up to the backend. Writes of an existing key overwrite.
pub trait BlockStore: Send + Sync {
    /// Store a serialized block under its hash.
    fn put_block(&self, hash: &Hash, block_bytes: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a serialized block by hash.
    fn get_block(&self, hash: &Hash) -> Result<Vec<u8>, StoreError>;

    /// Check if a block exists.
    fn exists(&self, hash: &Hash) -> Result<bool, StoreError>;

    /// Total number of blocks in the store.
    fn block_count(&self) -> Result<u64, StoreError>;
}

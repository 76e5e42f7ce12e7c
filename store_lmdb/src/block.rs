//! LMDB-backed [`BlockStore`].

use std::path::Path;

use meridian_store::{BlockStore, StoreError};
use meridian_types::Hash;

use crate::environment::{LmdbEnvironment, DEFAULT_MAP_SIZE};
use crate::LmdbError;

pub struct LmdbBlockStore {
    env: LmdbEnvironment,
}

impl LmdbBlockStore {
    pub fn open(path: &Path) -> Result<Self, LmdbError> {
        Self::open_with_map_size(path, DEFAULT_MAP_SIZE)
    }

    pub fn open_with_map_size(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        Ok(Self {
            env: LmdbEnvironment::open(path, map_size)?,
        })
    }

    fn get_inner(&self, hash: &Hash) -> Result<Vec<u8>, LmdbError> {
        let rtxn = self.env.env.read_txn()?;
        self.env
            .blocks
            .get(&rtxn, hash.as_bytes())?
            .map(<[u8]>::to_vec)
            .ok_or_else(|| LmdbError::NotFound(hash.to_string()))
    }
}

impl BlockStore for LmdbBlockStore {
    fn put_block(&self, hash: &Hash, block_bytes: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.env.write_txn().map_err(LmdbError::from)?;
        self.env
            .blocks
            .put(&mut wtxn, hash.as_bytes(), block_bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_block(&self, hash: &Hash) -> Result<Vec<u8>, StoreError> {
        Ok(self.get_inner(hash)?)
    }

    fn exists(&self, hash: &Hash) -> Result<bool, StoreError> {
        match self.get_inner(hash) {
            Ok(_) => Ok(true),
            Err(LmdbError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn block_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.env.blocks.len(&rtxn).map_err(LmdbError::from)?)
    }
}

//! Chain-extension rules.

use std::collections::HashSet;

use meridian_types::Hash;

use crate::block::{Block, Header, MAX_BLOCK_SIZE};
use crate::error::LedgerError;

/// Read access the validator needs from the chain.
pub trait ChainReader {
    fn height(&self) -> u64;
    fn has_block(&self, height: u64) -> bool;
    fn get_header(&self, height: u64) -> Result<Header, LedgerError>;
    /// Whether a transaction with this hash is already in some block.
    fn has_transaction(&self, hash: &Hash) -> bool;
}

/// Decides whether a candidate block may be appended.
pub trait Validator: Send + Sync {
    fn validate_block(&self, chain: &dyn ChainReader, block: &Block) -> Result<(), LedgerError>;
}

/// The standard rule set: no duplicates, no gaps, correct parent, bounded
/// size, no replayed transactions, and a self-consistent signed block.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockValidator;

impl BlockValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Validator for BlockValidator {
    fn validate_block(&self, chain: &dyn ChainReader, block: &Block) -> Result<(), LedgerError> {
        let height = block.height();
        if chain.has_block(height) {
            return Err(LedgerError::BlockKnown { height });
        }

        let expected = chain.height() + 1;
        if height != expected {
            return Err(LedgerError::HeightMismatch {
                expected,
                actual: height,
            });
        }

        let prev = chain.get_header(height - 1)?.hash();
        if prev != block.header.prev_block_hash {
            return Err(LedgerError::InvalidPrevHash {
                height,
                expected: prev,
                actual: block.header.prev_block_hash,
            });
        }

        let size = block.encoded_size()?;
        if size > MAX_BLOCK_SIZE {
            return Err(LedgerError::BlockTooLarge {
                size,
                max: MAX_BLOCK_SIZE,
            });
        }

        let mut seen = HashSet::with_capacity(block.transactions.len());
        for tx in &block.transactions {
            let hash = tx.hash();
            if !seen.insert(hash) || chain.has_transaction(&hash) {
                return Err(LedgerError::DuplicateTransaction { hash });
            }
        }

        block.verify()
    }
}

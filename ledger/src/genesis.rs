//! Genesis block creation.
//!
//! Genesis is fully deterministic: height 0, epoch timestamp, zero parent,
//! no signature, and a single unsigned coinbase crediting the genesis
//! account. Every node configured with the same account derives the same
//! genesis hash. Genesis is inserted when the ledger is constructed and is
//! never run through the validator.

use meridian_transactions::Transaction;
use meridian_types::{Hash, PublicKey, Timestamp};

use crate::block::{compute_data_hash, Block, Header, BLOCK_VERSION};

/// Coinbase value minted by genesis.
pub const GENESIS_SUPPLY: u64 = 10_000_000;

#[derive(Clone, Debug)]
pub struct GenesisConfig {
    /// Receives the coinbase.
    pub account: PublicKey,
    pub supply: u64,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            account: PublicKey([0u8; 32]),
            supply: GENESIS_SUPPLY,
        }
    }
}

pub fn create_genesis_block(config: &GenesisConfig) -> Block {
    let coinbase = Transaction::coinbase(config.account, config.supply);
    let transactions = vec![coinbase];
    let header = Header {
        version: BLOCK_VERSION,
        data_hash: compute_data_hash(&transactions),
        prev_block_hash: Hash::ZERO,
        height: 0,
        timestamp: Timestamp::EPOCH,
    };
    Block::new(header, transactions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_deterministic() {
        let a = create_genesis_block(&GenesisConfig::default());
        let b = create_genesis_block(&GenesisConfig::default());
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.height(), 0);
        assert_eq!(a.transactions.len(), 1);
        assert!(a.signature.is_none());
    }

    #[test]
    fn genesis_depends_on_account() {
        let a = create_genesis_block(&GenesisConfig::default());
        let b = create_genesis_block(&GenesisConfig {
            account: PublicKey([1; 32]),
            ..GenesisConfig::default()
        });
        assert_ne!(a.hash(), b.hash());
    }
}

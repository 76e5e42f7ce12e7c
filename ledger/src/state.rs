//! Account balances and NFT bookkeeping.
//!
//! Both are only ever written by the ledger while it applies transactions of
//! an accepted block.

use std::collections::HashMap;
use std::sync::RwLock;

use meridian_transactions::{CollectionTx, MintTx};
use meridian_types::{Address, Hash};

use crate::error::ApplyError;

/// Balance per account. Unknown accounts have balance zero.
#[derive(Debug, Default)]
pub struct AccountState {
    balances: RwLock<HashMap<Address, u64>>,
}

impl AccountState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, address: &Address) -> u64 {
        self.balances
            .read()
            .expect("account state lock poisoned")
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    /// Mint `amount` into `to`. Only genesis does this.
    pub fn credit(&self, to: Address, amount: u64) {
        let mut balances = self.balances.write().expect("account state lock poisoned");
        let entry = balances.entry(to).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Move `amount` from `from` to `to`, atomically.
    pub fn transfer(&self, from: Address, to: Address, amount: u64) -> Result<(), ApplyError> {
        let mut balances = self.balances.write().expect("account state lock poisoned");
        let balance = balances.get(&from).copied().unwrap_or(0);
        if balance < amount {
            return Err(ApplyError::InsufficientBalance {
                address: from,
                balance,
                amount,
            });
        }
        balances.insert(from, balance - amount);
        let entry = balances.entry(to).or_insert(0);
        *entry = entry.saturating_add(amount);
        Ok(())
    }

    /// Number of accounts that have ever held a balance.
    pub fn account_count(&self) -> usize {
        self.balances.read().expect("account state lock poisoned").len()
    }
}

/// NFT collections and mints, each keyed by the hash of the transaction
/// that created it.
#[derive(Debug, Default)]
pub struct NftState {
    collections: RwLock<HashMap<Hash, CollectionTx>>,
    mints: RwLock<HashMap<Hash, MintTx>>,
}

impl NftState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_collection(&self, tx_hash: Hash, collection: CollectionTx) {
        self.collections
            .write()
            .expect("nft state lock poisoned")
            .insert(tx_hash, collection);
    }

    /// Record a mint; its collection must already exist.
    pub fn add_mint(&self, tx_hash: Hash, mint: MintTx) -> Result<(), ApplyError> {
        if !self.has_collection(&mint.collection) {
            return Err(ApplyError::CollectionNotFound(mint.collection));
        }
        self.mints
            .write()
            .expect("nft state lock poisoned")
            .insert(tx_hash, mint);
        Ok(())
    }

    pub fn has_collection(&self, hash: &Hash) -> bool {
        self.collections
            .read()
            .expect("nft state lock poisoned")
            .contains_key(hash)
    }

    pub fn collection(&self, hash: &Hash) -> Option<CollectionTx> {
        self.collections
            .read()
            .expect("nft state lock poisoned")
            .get(hash)
            .cloned()
    }

    pub fn mint(&self, hash: &Hash) -> Option<MintTx> {
        self.mints
            .read()
            .expect("nft state lock poisoned")
            .get(hash)
            .cloned()
    }
}

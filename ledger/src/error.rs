use meridian_store::StoreError;
use meridian_transactions::TransactionError;
use meridian_types::{Address, Hash};
use meridian_vm::VmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("chain already contains a block at height {height}")]
    BlockKnown { height: u64 },

    #[error("block height {actual} does not extend chain (expected {expected})")]
    HeightMismatch { expected: u64, actual: u64 },

    #[error("block at height {height} has prev hash {actual}, chain has {expected}")]
    InvalidPrevHash {
        height: u64,
        expected: Hash,
        actual: Hash,
    },

    #[error("block {hash} has no signature")]
    MissingSignature { hash: Hash },

    #[error("invalid signature on block {hash}")]
    InvalidSignature { hash: Hash },

    #[error("data hash mismatch: header has {expected}, transactions hash to {actual}")]
    InvalidDataHash { expected: Hash, actual: Hash },

    #[error("block encodes to {size} bytes, limit is {max}")]
    BlockTooLarge { size: u64, max: u64 },

    #[error("transaction {hash} is already in the chain or repeated in the block")]
    DuplicateTransaction { hash: Hash },

    #[error("invalid transaction in block: {0}")]
    InvalidTransaction(#[from] TransactionError),

    #[error("height {height} out of range (current height {current})")]
    OutOfRange { height: u64, current: u64 },

    #[error("invalid block range {from}..={to}")]
    InvalidRange { from: u64, to: u64 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("genesis block must be at height 0, got {0}")]
    InvalidGenesis(u64),

    #[error("ledger lock poisoned by an earlier panic")]
    Poisoned,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl LedgerError {
    /// `BlockKnown` is the expected outcome of receiving a block we already
    /// have and is not worth reporting as a failure.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::BlockKnown { .. })
    }
}

/// Why one transaction could not be applied to state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("account {address} has balance {balance}, cannot send {amount}")]
    InsufficientBalance {
        address: Address,
        balance: u64,
        amount: u64,
    },

    #[error("collection {0} does not exist")]
    CollectionNotFound(Hash),

    #[error("value transfer without recipient")]
    MissingRecipient,

    #[error("value transfer without sender outside genesis")]
    MissingSender,

    #[error("contract execution failed: {0}")]
    Vm(#[from] VmError),
}

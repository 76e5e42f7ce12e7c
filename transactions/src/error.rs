use meridian_types::Hash;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction {tx_hash} has no signature")]
    MissingSignature { tx_hash: Hash },

    #[error("invalid signature on transaction {tx_hash}")]
    InvalidSignature { tx_hash: Hash },

    #[error("invalid collection-owner signature on mint of nft {nft}")]
    InvalidMintSignature { nft: Hash },

    #[error("transaction {tx_hash} moves value {value} without a recipient")]
    MissingRecipient { tx_hash: Hash, value: u64 },

    #[error("contract data too large: {size} bytes (max {max})")]
    DataTooLarge { size: usize, max: usize },
}

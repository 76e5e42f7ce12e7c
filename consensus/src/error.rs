use meridian_types::Address;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("stakeholder {0} not found")]
    NotFound(Address),

    #[error("stakeholder {address} has {staked} staked, cannot remove {requested}")]
    InsufficientStake {
        address: Address,
        staked: u64,
        requested: u64,
    },

    #[error("cannot select {requested} validators from {available} with stake")]
    InsufficientValidators { requested: usize, available: usize },
}

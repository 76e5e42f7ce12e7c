//! Proposer assignment for candidate blocks.

use meridian_ledger::Block;

use crate::error::ConsensusError;
use crate::selection::{SelectedValidator, ValidatorSelector};

/// What the node needs from consensus when it produces a block.
pub trait ProposerSelector: Send + Sync {
    /// Choose the proposer for `block`'s slot and record it on the block.
    /// Must be called before the block is signed.
    fn select_proposer(&self, block: &mut Block) -> Result<SelectedValidator, ConsensusError>;
}

impl ProposerSelector for ValidatorSelector {
    fn select_proposer(&self, block: &mut Block) -> Result<SelectedValidator, ConsensusError> {
        let chosen = self.select_validators(1)?.into_iter().next().ok_or(
            ConsensusError::InsufficientValidators {
                requested: 1,
                available: 0,
            },
        )?;
        block.proposer = Some(chosen.address);
        Ok(chosen)
    }
}

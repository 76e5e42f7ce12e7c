//! Proof-of-stake proposer selection.
//!
//! - [`stake`]: per-address stake bookkeeping, no consensus logic.
//! - [`selection`]: stake-weighted sampling without replacement.
//! - [`proposer`]: the narrow interface the node uses to stamp a proposer
//!   onto a candidate block.
//!
//! Nothing here depends on networking types.

pub mod error;
pub mod proposer;
pub mod selection;
pub mod stake;

pub use error::ConsensusError;
pub use proposer::ProposerSelector;
pub use selection::{SelectedValidator, ValidatorSelector};
pub use stake::{StakeRegistry, Stakeholder};

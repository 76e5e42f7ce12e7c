//! Linear block ledger.
//!
//! Blocks extend a single chain height by height. Every candidate passes the
//! [`BlockValidator`] before its transactions are applied to account, NFT
//! and contract state. A transaction that fails to apply is skipped; it
//! never fails the block that carries it.

pub mod block;
pub mod blockchain;
pub mod error;
pub mod genesis;
pub mod state;
pub mod validator;

pub use block::{fill_within_budget, Block, Header, BLOCK_VERSION, MAX_BLOCK_SIZE};
pub use blockchain::{Blockchain, LedgerSummary};
pub use error::{ApplyError, LedgerError};
pub use genesis::{create_genesis_block, GenesisConfig, GENESIS_SUPPLY};
pub use state::{AccountState, NftState};
pub use validator::{BlockValidator, ChainReader, Validator};

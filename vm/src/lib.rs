//! Contract execution for Meridian transactions.
//!
//! Transactions with non-empty `data` run that bytecode on a small stack
//! machine against the chain's [`ContractState`]. The ledger only depends on
//! the [`Executor`] trait so tests can swap in a scripted executor.

pub mod error;
pub mod instruction;
pub mod machine;
pub mod state;

pub use error::{StateError, VmError};
pub use instruction::Instruction;
pub use machine::{Executor, StackValue, StackVm};
pub use state::ContractState;

//! Meridian transactions and their integrity checks.
//!
//! A [`Transaction`] can move value, carry contract bytecode for the VM, and
//! carry one application payload ([`TxInner`]):
//! - **Transfer**: plain value movement, no extra payload
//! - **CollectionCreate**: register an NFT collection
//! - **Mint**: mint an NFT into an existing collection, countersigned by the
//!   collection owner

pub mod encoding;
pub mod error;
pub mod inner;
pub mod transaction;
pub mod validation;

pub use error::TransactionError;
pub use inner::{CollectionTx, MintTx, TxInner};
pub use transaction::Transaction;
pub use validation::validate_transaction;

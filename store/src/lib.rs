//! Abstract storage traits for Meridian.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The ledger depends only on the traits and owns the encoding of
//! what it stores.

pub mod block;
pub mod error;

pub use block::BlockStore;
pub use error::StoreError;

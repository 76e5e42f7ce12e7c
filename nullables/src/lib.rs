//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies of the ledger (block storage, contract execution)
//! are abstracted behind traits. This crate provides implementations that:
//! - Never touch the filesystem
//! - Can be controlled programmatically (forced failures, call recording)
//!
//! Usage: swap real implementations for nullables in tests, or run a node
//! without a data directory.

pub mod executor;
pub mod store;

pub use executor::NullExecutor;
pub use store::NullStore;

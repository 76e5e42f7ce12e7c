//! LMDB storage backend for Meridian.
//!
//! Implements the `meridian-store` traits using the `heed` LMDB bindings.
//! Each logical store maps to one LMDB database within a single environment.

pub mod block;
pub mod environment;
pub mod error;

pub use block::LmdbBlockStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;

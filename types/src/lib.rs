//! Fundamental types for the Meridian chain.
//!
//! This crate defines the primitives shared across every other crate in the
//! workspace: content hashes, account addresses, key material and timestamps.

pub mod address;
pub mod error;
pub mod hash;
pub mod keys;
pub mod time;

pub use address::Address;
pub use error::ParseError;
pub use hash::Hash;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use time::Timestamp;

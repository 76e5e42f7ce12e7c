//! Cryptographic primitives for the Meridian chain.
//!
//! - **Ed25519** for transaction and block signatures
//! - **Blake2b-256** for every content digest (blocks, transactions, data hashes)
//! - Address derivation by digest truncation of the public key

pub mod address;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::derive_address;
pub use hash::{blake2b_256, blake2b_256_multi, digest, digest_multi};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};

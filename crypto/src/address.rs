//! Account address derivation.
//!
//! An address is the trailing 20 bytes of Blake2b-256(public_key).

use meridian_types::{Address, PublicKey};

use crate::hash::blake2b_256;

/// Derive the account address for a public key.
pub fn derive_address(public_key: &PublicKey) -> Address {
    let digest = blake2b_256(public_key.as_bytes());
    let mut out = [0u8; Address::LEN];
    out.copy_from_slice(&digest[32 - Address::LEN..]);
    Address::new(out)
}

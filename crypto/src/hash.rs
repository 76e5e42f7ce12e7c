//! Blake2b-256 digests.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use meridian_types::Hash;

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[data])
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Content digest of a canonical encoding.
pub fn digest(data: &[u8]) -> Hash {
    Hash::new(blake2b_256(data))
}

/// Content digest over several encodings, as if they were concatenated.
pub fn digest_multi(parts: &[&[u8]]) -> Hash {
    Hash::new(blake2b_256_multi(parts))
}

//! Ed25519 signing and verification.
//!
//! Both blocks and transactions sign their content hash, never the raw
//! encoding, so callers pass the 32 hash bytes as `message`.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use meridian_types::{PrivateKey, PublicKey, Signature};

/// Sign a message with a private key.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    Signature(signing_key.sign(message).to_bytes())
}

/// Verify a signature against a message and public key.
///
/// Malformed public keys verify as `false` rather than erroring.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify(message, &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::digest;
    use crate::keys::{generate_keypair, keypair_from_seed};

    #[test]
    fn sign_and_verify_hash() {
        let kp = generate_keypair();
        let h = digest(b"header bytes");
        let sig = sign_message(h.as_bytes(), &kp.private);
        assert!(verify_signature(h.as_bytes(), &sig, &kp.public));
    }

    #[test]
    fn tampered_message_fails() {
        let kp = generate_keypair();
        let sig = sign_message(b"height=1", &kp.private);
        assert!(!verify_signature(b"height=2", &sig, &kp.public));
    }

    #[test]
    fn other_signer_fails() {
        let a = keypair_from_seed(&[1u8; 32]);
        let b = keypair_from_seed(&[2u8; 32]);
        let sig = sign_message(b"msg", &a.private);
        assert!(!verify_signature(b"msg", &sig, &b.public));
    }

    #[test]
    fn deterministic_signatures() {
        let kp = keypair_from_seed(&[99u8; 32]);
        assert_eq!(
            sign_message(b"x", &kp.private),
            sign_message(b"x", &kp.private)
        );
    }

    #[test]
    fn garbage_public_key_does_not_verify() {
        let kp = generate_keypair();
        let sig = sign_message(b"test", &kp.private);
        assert!(!verify_signature(b"test", &sig, &PublicKey([0xFF; 32])));
    }
}

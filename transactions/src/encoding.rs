//! Canonical byte encodings.
//!
//! These are fixed layouts rather than serializer output so that the hash of
//! a transaction never depends on a serialization library's version.
//!
//! Hash content: `to | value | nonce | len(data) | data | tag | inner`.
//! Full encoding: hash content followed by `from | signature`. Absent keys
//! and signatures encode as zero bytes.

use meridian_types::{PublicKey, Signature};

use crate::inner::TxInner;
use crate::transaction::Transaction;

const ZERO_KEY: [u8; 32] = [0u8; 32];
const ZERO_SIG: [u8; 64] = [0u8; 64];

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn put_key(out: &mut Vec<u8>, key: Option<&PublicKey>) {
    let bytes: &[u8; 32] = key.map_or(&ZERO_KEY, |k| k.as_bytes());
    out.extend_from_slice(bytes);
}

fn put_sig(out: &mut Vec<u8>, sig: Option<&Signature>) {
    let bytes: &[u8; 64] = sig.map_or(&ZERO_SIG, |s| s.as_bytes());
    out.extend_from_slice(bytes);
}

fn put_inner(out: &mut Vec<u8>, inner: &TxInner) {
    out.push(inner.tag());
    match inner {
        TxInner::Transfer => {}
        TxInner::CollectionCreate(c) => {
            out.extend_from_slice(&c.fee.to_le_bytes());
            put_bytes(out, &c.metadata);
        }
        TxInner::Mint(m) => {
            out.extend_from_slice(&m.fee.to_le_bytes());
            out.extend_from_slice(m.nft.as_bytes());
            out.extend_from_slice(m.collection.as_bytes());
            put_bytes(out, &m.metadata);
            put_key(out, Some(&m.collection_owner));
            put_sig(out, Some(&m.signature));
        }
    }
}

impl Transaction {
    /// Bytes covered by the transaction hash (and therefore the signature).
    pub fn hash_content(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.data.len());
        put_key(&mut out, self.to.as_ref());
        out.extend_from_slice(&self.value.to_le_bytes());
        out.extend_from_slice(&self.nonce.to_le_bytes());
        put_bytes(&mut out, &self.data);
        put_inner(&mut out, &self.inner);
        out
    }

    /// Full encoding including sender and signature. Block data hashes are
    /// computed over these.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.hash_content();
        put_key(&mut out, self.from.as_ref());
        put_sig(&mut out, self.signature.as_ref());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inner::CollectionTx;

    fn tx() -> Transaction {
        Transaction {
            to: Some(PublicKey([3; 32])),
            value: 7,
            nonce: 1,
            data: vec![0xAA],
            ..Transaction::default()
        }
    }

    #[test]
    fn hash_content_layout() {
        let bytes = tx().hash_content();
        // to(32) + value(8) + nonce(8) + len(4) + data(1) + tag(1)
        assert_eq!(bytes.len(), 54);
        assert_eq!(&bytes[..32], &[3u8; 32]);
        assert_eq!(&bytes[32..40], &7u64.to_le_bytes());
        assert_eq!(bytes[52], 0xAA);
        assert_eq!(bytes[53], TxInner::TAG_TRANSFER);
    }

    #[test]
    fn full_encoding_appends_sender_and_signature() {
        let t = tx();
        assert_eq!(t.encode().len(), t.hash_content().len() + 32 + 64);
    }

    #[test]
    fn absent_keys_and_signature_encode_as_zeros() {
        let mut t = tx();
        t.to = None;
        let bytes = t.encode();
        assert_eq!(&bytes[..32], &ZERO_KEY);
        let tail = &bytes[bytes.len() - 96..];
        assert!(tail.iter().all(|b| *b == 0));
    }

    #[test]
    fn inner_payload_changes_hash_content() {
        let a = tx();
        let mut b = tx();
        b.inner = TxInner::CollectionCreate(CollectionTx {
            fee: 1,
            metadata: b"punks".to_vec(),
        });
        assert_ne!(a.hash_content(), b.hash_content());
    }
}

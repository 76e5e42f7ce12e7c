//! Block headers and blocks.

use std::sync::OnceLock;

use meridian_crypto::{digest, digest_multi, public_from_private, sign_message, verify_signature};
use meridian_transactions::Transaction;
use meridian_types::{Address, Hash, PrivateKey, PublicKey, Signature, Timestamp};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Current header version.
pub const BLOCK_VERSION: u32 = 1;

/// Largest encoded block the chain accepts. Half the wire frame limit, so a
/// block or a batch of blocks always fits in one envelope.
pub const MAX_BLOCK_SIZE: u64 = 8 * 1024 * 1024;

/// Room kept for the encoded header, keys, and signature when filling a
/// block with transactions.
const BLOCK_OVERHEAD: u64 = 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    /// Digest over the full encodings of the block's transactions.
    pub data_hash: Hash,
    pub prev_block_hash: Hash,
    pub height: u64,
    pub timestamp: Timestamp,
}

impl Header {
    /// Canonical header bytes: `version | height | timestamp | prev | data`.
    /// The block hash covers exactly these.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 8 + 8 + 32 + 32);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.timestamp.as_nanos().to_le_bytes());
        out.extend_from_slice(self.prev_block_hash.as_bytes());
        out.extend_from_slice(self.data_hash.as_bytes());
        out
    }

    pub fn hash(&self) -> Hash {
        digest(&self.bytes())
    }
}

/// A header, its ordered transactions, and the proposer's identity and
/// signature.
///
/// The hash covers only the header and is memoized on first use.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    /// Public key of the signer; set by [`Block::sign`].
    pub validator: Option<PublicKey>,
    /// Address picked by stake-weighted selection for this slot.
    pub proposer: Option<Address>,
    pub signature: Option<Signature>,
    #[serde(skip)]
    hash: OnceLock<Hash>,
}

/// Longest prefix of `candidates` that fits a block within
/// [`MAX_BLOCK_SIZE`].
pub fn fill_within_budget(candidates: Vec<Transaction>) -> Vec<Transaction> {
    // Length prefix of the transaction list.
    let mut used = BLOCK_OVERHEAD + 8;
    let mut taken = Vec::with_capacity(candidates.len());
    for tx in candidates {
        let size = bincode::serialized_size(&tx).unwrap_or(u64::MAX);
        if used.saturating_add(size) > MAX_BLOCK_SIZE {
            break;
        }
        used += size;
        taken.push(tx);
    }
    taken
}

/// Digest over the full encodings of `txs`, in order.
pub fn compute_data_hash(txs: &[Transaction]) -> Hash {
    let encodings: Vec<Vec<u8>> = txs.iter().map(Transaction::encode).collect();
    let parts: Vec<&[u8]> = encodings.iter().map(Vec::as_slice).collect();
    digest_multi(&parts)
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
            validator: None,
            proposer: None,
            signature: None,
            hash: OnceLock::new(),
        }
    }

    /// Build the next block on top of `prev`, timestamped now.
    pub fn from_prev_header(prev: &Header, transactions: Vec<Transaction>) -> Self {
        let header = Header {
            version: BLOCK_VERSION,
            data_hash: compute_data_hash(&transactions),
            prev_block_hash: prev.hash(),
            height: prev.height + 1,
            timestamp: Timestamp::now(),
        };
        Self::new(header, transactions)
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn hash(&self) -> Hash {
        *self.hash.get_or_init(|| self.header.hash())
    }

    /// Size of the block's bincode encoding, as carried on the wire.
    pub fn encoded_size(&self) -> Result<u64, LedgerError> {
        bincode::serialized_size(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// Bytes the validator signs: the header bytes followed by the proposer
    /// address, or 20 zero bytes when none is set.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut out = self.header.bytes();
        match &self.proposer {
            Some(proposer) => out.extend_from_slice(proposer.as_bytes()),
            None => out.extend_from_slice(&[0u8; 20]),
        }
        out
    }

    /// Sign [`Block::signing_bytes`] and record the signer as validator.
    /// Set the proposer first; changing it afterwards voids the signature.
    pub fn sign(&mut self, private_key: &PrivateKey) {
        self.signature = Some(sign_message(&self.signing_bytes(), private_key));
        self.validator = Some(public_from_private(private_key));
    }

    /// Check the validator signature, every transaction, and the data hash.
    pub fn verify(&self) -> Result<(), LedgerError> {
        let hash = self.hash();
        let (Some(validator), Some(signature)) = (&self.validator, &self.signature) else {
            return Err(LedgerError::MissingSignature { hash });
        };
        if !verify_signature(&self.signing_bytes(), signature, validator) {
            return Err(LedgerError::InvalidSignature { hash });
        }

        self.transactions.par_iter().try_for_each(Transaction::verify)?;

        let actual = compute_data_hash(&self.transactions);
        if actual != self.header.data_hash {
            return Err(LedgerError::InvalidDataHash {
                expected: self.header.data_hash,
                actual,
            });
        }
        Ok(())
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.transactions == other.transactions
            && self.validator == other.validator
            && self.proposer == other.proposer
            && self.signature == other.signature
    }
}

impl Eq for Block {}

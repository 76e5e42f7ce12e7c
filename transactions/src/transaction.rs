//! The transaction type.

use std::sync::OnceLock;

use meridian_crypto::{digest, public_from_private, sign_message};
use meridian_types::{Hash, PrivateKey, PublicKey, Signature};
use serde::{Deserialize, Serialize};

use crate::inner::{CollectionTx, MintTx, TxInner};

/// An intent to transfer value, run contract code, or perform a collection
/// or mint action.
///
/// The hash is memoized on first use. Mutating content fields after the hash
/// has been read leaves a stale hash; build the transaction fully before
/// hashing or signing it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Transaction {
    /// Contract bytecode; empty for non-contract transactions.
    pub data: Vec<u8>,
    pub to: Option<PublicKey>,
    pub value: u64,
    /// Set by [`Transaction::sign`].
    pub from: Option<PublicKey>,
    pub signature: Option<Signature>,
    pub nonce: u64,
    pub inner: TxInner,
    #[serde(skip)]
    pub(crate) hash: OnceLock<Hash>,
}

impl Transaction {
    /// A transaction carrying contract bytecode, with a random nonce.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            nonce: rand::random(),
            ..Self::default()
        }
    }

    /// A plain value transfer, with a random nonce.
    pub fn transfer(to: PublicKey, value: u64) -> Self {
        Self {
            to: Some(to),
            value,
            nonce: rand::random(),
            ..Self::default()
        }
    }

    /// Register a new NFT collection.
    pub fn create_collection(fee: u64, metadata: Vec<u8>) -> Self {
        Self {
            inner: TxInner::CollectionCreate(CollectionTx { fee, metadata }),
            nonce: rand::random(),
            ..Self::default()
        }
    }

    /// Mint an NFT; `mint` must already carry the owner's signature.
    pub fn mint(mint: MintTx) -> Self {
        Self {
            inner: TxInner::Mint(mint),
            nonce: rand::random(),
            ..Self::default()
        }
    }

    /// The genesis coinbase: unsigned, no sender, nonce zero.
    pub fn coinbase(to: PublicKey, value: u64) -> Self {
        Self {
            to: Some(to),
            value,
            ..Self::default()
        }
    }

    /// Content hash over [`Transaction::hash_content`]; computed once.
    pub fn hash(&self) -> Hash {
        *self.hash.get_or_init(|| digest(&self.hash_content()))
    }

    /// Sign the content hash and record the signer as the sender.
    ///
    /// `from` is not part of the hash, so signing never changes it.
    pub fn sign(&mut self, private_key: &PrivateKey) {
        let hash = self.hash();
        self.signature = Some(sign_message(hash.as_bytes(), private_key));
        self.from = Some(public_from_private(private_key));
    }

    pub fn is_signed(&self) -> bool {
        self.from.is_some() && self.signature.is_some()
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
            && self.to == other.to
            && self.value == other.value
            && self.from == other.from
            && self.signature == other.signature
            && self.nonce == other.nonce
            && self.inner == other.inner
    }
}

impl Eq for Transaction {}

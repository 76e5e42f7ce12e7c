//! Application payloads carried by a transaction.

use meridian_crypto::{public_from_private, sign_message, verify_signature};
use meridian_types::{Hash, PrivateKey, PublicKey, Signature};
use serde::{Deserialize, Serialize};

use crate::error::TransactionError;

/// The closed set of payload kinds. Dispatch is by tag.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxInner {
    #[default]
    Transfer,
    CollectionCreate(CollectionTx),
    Mint(MintTx),
}

/// Registers an NFT collection. The collection is identified by the hash of
/// the transaction that created it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionTx {
    pub fee: u64,
    pub metadata: Vec<u8>,
}

/// Mints an NFT into a collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintTx {
    pub fee: u64,
    /// NFT identifier; the owner's signature covers these bytes.
    pub nft: Hash,
    /// Hash of the `CollectionCreate` transaction.
    pub collection: Hash,
    pub metadata: Vec<u8>,
    pub collection_owner: PublicKey,
    pub signature: Signature,
}

impl TxInner {
    pub(crate) const TAG_TRANSFER: u8 = 0;
    pub(crate) const TAG_COLLECTION: u8 = 1;
    pub(crate) const TAG_MINT: u8 = 2;

    pub fn tag(&self) -> u8 {
        match self {
            Self::Transfer => Self::TAG_TRANSFER,
            Self::CollectionCreate(_) => Self::TAG_COLLECTION,
            Self::Mint(_) => Self::TAG_MINT,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::CollectionCreate(_) => "collection",
            Self::Mint(_) => "mint",
        }
    }
}

impl MintTx {
    /// Build a mint countersigned by the collection owner.
    pub fn new(
        fee: u64,
        nft: Hash,
        collection: Hash,
        metadata: Vec<u8>,
        owner: &PrivateKey,
    ) -> Self {
        Self {
            fee,
            nft,
            collection,
            metadata,
            collection_owner: public_from_private(owner),
            signature: sign_message(nft.as_bytes(), owner),
        }
    }

    /// Check the collection owner's signature over the NFT identifier.
    pub fn verify(&self) -> Result<(), TransactionError> {
        if verify_signature(self.nft.as_bytes(), &self.signature, &self.collection_owner) {
            Ok(())
        } else {
            Err(TransactionError::InvalidMintSignature { nft: self.nft })
        }
    }
}

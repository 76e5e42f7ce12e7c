//! Stateless transaction checks.
//!
//! Stateful checks (balances, collection existence) are done by the ledger
//! when the transaction is applied.

use meridian_crypto::verify_signature;

use crate::error::TransactionError;
use crate::inner::TxInner;
use crate::transaction::Transaction;

/// Upper bound on contract bytecode carried by one transaction.
pub const MAX_DATA_SIZE: usize = 64 * 1024;

impl Transaction {
    /// Verify the sender's signature over the cached hash, then any
    /// payload-specific signature.
    pub fn verify(&self) -> Result<(), TransactionError> {
        let tx_hash = self.hash();
        let (Some(from), Some(signature)) = (&self.from, &self.signature) else {
            return Err(TransactionError::MissingSignature { tx_hash });
        };
        if !verify_signature(tx_hash.as_bytes(), signature, from) {
            return Err(TransactionError::InvalidSignature { tx_hash });
        }
        if let TxInner::Mint(mint) = &self.inner {
            mint.verify()?;
        }
        Ok(())
    }
}

/// Full admission check used by the mempool path: signatures plus shape.
pub fn validate_transaction(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.data.len() > MAX_DATA_SIZE {
        return Err(TransactionError::DataTooLarge {
            size: tx.data.len(),
            max: MAX_DATA_SIZE,
        });
    }
    if tx.value > 0 && tx.to.is_none() {
        return Err(TransactionError::MissingRecipient {
            tx_hash: tx.hash(),
            value: tx.value,
        });
    }
    tx.verify()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inner::MintTx;
    use meridian_crypto::keypair_from_seed;
    use meridian_types::{Hash, PublicKey};

    #[test]
    fn unsigned_is_missing_signature() {
        let tx = Transaction::transfer(PublicKey([1; 32]), 3);
        assert!(matches!(
            tx.verify(),
            Err(TransactionError::MissingSignature { .. })
        ));
    }

    #[test]
    fn signed_verifies() {
        let kp = keypair_from_seed(&[1; 32]);
        let mut tx = Transaction::transfer(PublicKey([1; 32]), 3);
        tx.sign(&kp.private);
        assert_eq!(tx.verify(), Ok(()));
    }

    #[test]
    fn foreign_sender_is_invalid() {
        let kp = keypair_from_seed(&[1; 32]);
        let other = keypair_from_seed(&[2; 32]);
        let mut tx = Transaction::transfer(PublicKey([1; 32]), 3);
        tx.sign(&kp.private);
        tx.from = Some(other.public);
        assert!(matches!(
            tx.verify(),
            Err(TransactionError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn tampered_value_is_invalid() {
        let kp = keypair_from_seed(&[1; 32]);
        let mut tx = Transaction::transfer(PublicKey([1; 32]), 3);
        tx.sign(&kp.private);

        let mut forged = Transaction::transfer(PublicKey([1; 32]), 300);
        forged.nonce = tx.nonce;
        forged.from = tx.from;
        forged.signature = tx.signature;
        assert!(matches!(
            forged.verify(),
            Err(TransactionError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn mint_owner_signature_is_checked() {
        let sender = keypair_from_seed(&[1; 32]);
        let owner = keypair_from_seed(&[2; 32]);
        let mut mint = MintTx::new(0, Hash::new([4; 32]), Hash::new([5; 32]), vec![], &owner.private);
        mint.collection_owner = sender.public;
        let mut tx = Transaction::mint(mint);
        tx.sign(&sender.private);
        assert!(matches!(
            tx.verify(),
            Err(TransactionError::InvalidMintSignature { .. })
        ));
    }

    #[test]
    fn value_without_recipient_rejected() {
        let kp = keypair_from_seed(&[1; 32]);
        let mut tx = Transaction::new(vec![]);
        tx.value = 5;
        tx.sign(&kp.private);
        assert!(matches!(
            validate_transaction(&tx),
            Err(TransactionError::MissingRecipient { value: 5, .. })
        ));
    }

    #[test]
    fn oversized_data_rejected() {
        let tx = Transaction::new(vec![0; MAX_DATA_SIZE + 1]);
        assert!(matches!(
            validate_transaction(&tx),
            Err(TransactionError::DataTooLarge { .. })
        ));
    }
}

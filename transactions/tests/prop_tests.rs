use proptest::prelude::*;

use meridian_crypto::keypair_from_seed;
use meridian_transactions::{CollectionTx, Transaction, TxInner};
use meridian_types::PublicKey;

fn arb_inner() -> impl Strategy<Value = TxInner> {
    prop_oneof![
        Just(TxInner::Transfer),
        (any::<u64>(), prop::collection::vec(any::<u8>(), 0..32))
            .prop_map(|(fee, metadata)| TxInner::CollectionCreate(CollectionTx { fee, metadata })),
    ]
}

fn arb_tx() -> impl Strategy<Value = Transaction> {
    (
        prop::collection::vec(any::<u8>(), 0..64),
        prop::option::of(prop::array::uniform32(0u8..)),
        any::<u64>(),
        any::<u64>(),
        arb_inner(),
    )
        .prop_map(|(data, to, value, nonce, inner)| {
            let mut tx = Transaction::new(data);
            tx.to = to.map(PublicKey);
            tx.value = value;
            tx.nonce = nonce;
            tx.inner = inner;
            tx
        })
}

proptest! {
    /// Signing never changes the hash, whether or not it was read first.
    #[test]
    fn hash_independent_of_signing(tx in arb_tx(), seed in prop::array::uniform32(1u8..)) {
        let kp = keypair_from_seed(&seed);
        let unsigned_hash = tx.clone().hash();

        let mut signed = tx.clone();
        signed.sign(&kp.private);
        prop_assert_eq!(signed.hash(), unsigned_hash);

        let decoded: Transaction =
            bincode::deserialize(&bincode::serialize(&signed).unwrap()).unwrap();
        prop_assert_eq!(decoded.hash(), unsigned_hash);
        prop_assert!(decoded.verify().is_ok());
    }

    /// Repeated hash reads return the same value.
    #[test]
    fn hash_stable(tx in arb_tx()) {
        let h = tx.hash();
        for _ in 0..3 {
            prop_assert_eq!(tx.hash(), h);
        }
    }

    /// Any signed transaction survives the JSON API representation.
    #[test]
    fn json_preserves_signature(tx in arb_tx()) {
        let kp = keypair_from_seed(&[7u8; 32]);
        let mut tx = tx;
        tx.sign(&kp.private);
        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        prop_assert!(back.verify().is_ok());
        prop_assert_eq!(back, tx);
    }
}

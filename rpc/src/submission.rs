//! Requests the REST layer hands to the node's event loop.

use meridian_ledger::Block;
use meridian_transactions::Transaction;
use meridian_types::Hash;
use tokio::sync::oneshot;

/// Outcome of a transaction submission the node accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxSubmitted {
    pub hash: Hash,
    /// `false` when the pool already knew the transaction.
    pub new: bool,
}

/// A write that must go through the event loop. Rejections carry a
/// human-readable reason.
#[derive(Debug)]
pub enum LocalSubmission {
    Transaction {
        tx: Transaction,
        reply: oneshot::Sender<Result<TxSubmitted, String>>,
    },
    Block {
        block: Block,
        reply: oneshot::Sender<Result<Hash, String>>,
    },
}

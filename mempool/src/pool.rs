//! The transaction pool.

use std::sync::{Arc, Mutex};

use meridian_transactions::Transaction;
use meridian_types::Hash;
use tracing::debug;

use crate::sorted_map::TxSortedMap;

/// Default bound on `all`.
pub const DEFAULT_POOL_CAPACITY: usize = 1000;

struct PoolInner {
    all: TxSortedMap,
    pending: TxSortedMap,
}

/// `all` + `pending`, both behind one mutex so eviction and insertion are a
/// single atomic step.
pub struct TxPool {
    inner: Mutex<PoolInner>,
    capacity: usize,
}

impl TxPool {
    /// A pool holding at most `capacity` transactions in `all` (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                all: TxSortedMap::new(),
                pending: TxSortedMap::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolInner> {
        self.inner.lock().expect("tx pool lock poisoned")
    }

    /// Add a transaction to both sets. Known hashes are ignored.
    ///
    /// Returns `true` when the transaction was new.
    pub fn add(&self, tx: Transaction) -> bool {
        let tx = Arc::new(tx);
        let mut inner = self.lock();
        if inner.all.contains(&tx.hash()) {
            return false;
        }
        if inner.all.len() >= self.capacity {
            if let Some(evicted) = inner.all.pop_first() {
                debug!(tx = %evicted.hash(), "evicted oldest transaction from pool");
            }
        }
        inner.all.add(tx.clone());
        inner.pending.add(tx);
        true
    }

    /// Snapshot of `pending` in arrival order.
    pub fn pending(&self) -> Vec<Transaction> {
        self.lock().pending.to_vec()
    }

    /// Empty `pending`; `all` keeps every entry.
    pub fn clear_pending(&self) {
        self.lock().pending.clear();
    }

    /// Drop the listed hashes from `pending`, typically the transactions of a
    /// block just appended. `all` keeps them so a late relayed copy is not
    /// pooled again. Returns how many were pending.
    pub fn remove_pending(&self, hashes: &[Hash]) -> usize {
        self.lock().pending.remove_all(hashes)
    }

    /// Atomically take the pending set and clear it.
    pub fn take_pending(&self) -> Vec<Transaction> {
        let mut inner = self.lock();
        let txs = inner.pending.to_vec();
        inner.pending.clear();
        txs
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.lock().all.contains(hash)
    }

    pub fn get(&self, hash: &Hash) -> Option<Transaction> {
        self.lock().all.get(hash).map(|tx| Transaction::clone(tx))
    }

    /// Size of `all`.
    pub fn count(&self) -> usize {
        self.lock().all.len()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TxPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

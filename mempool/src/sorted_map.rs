//! Insertion-ordered transaction map.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use meridian_transactions::Transaction;
use meridian_types::Hash;

/// Transactions keyed by hash, remembering arrival order.
///
/// Not thread-safe on its own; [`crate::TxPool`] guards it.
#[derive(Debug, Default)]
pub struct TxSortedMap {
    lookup: HashMap<Hash, Arc<Transaction>>,
    order: VecDeque<Hash>,
}

impl TxSortedMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the back. Returns `false` if the hash is already present.
    pub fn add(&mut self, tx: Arc<Transaction>) -> bool {
        let hash = tx.hash();
        if self.lookup.contains_key(&hash) {
            return false;
        }
        self.lookup.insert(hash, tx);
        self.order.push_back(hash);
        true
    }

    pub fn get(&self, hash: &Hash) -> Option<&Arc<Transaction>> {
        self.lookup.get(hash)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.lookup.contains_key(hash)
    }

    /// The oldest entry.
    pub fn first(&self) -> Option<&Arc<Transaction>> {
        self.order.front().and_then(|h| self.lookup.get(h))
    }

    /// Remove and return the oldest entry.
    pub fn pop_first(&mut self) -> Option<Arc<Transaction>> {
        let hash = self.order.pop_front()?;
        self.lookup.remove(&hash)
    }

    /// Remove every listed hash; unknown hashes are ignored. Returns how
    /// many entries were removed.
    pub fn remove_all(&mut self, hashes: &[Hash]) -> usize {
        let removed = hashes
            .iter()
            .filter(|h| self.lookup.remove(*h).is_some())
            .count();
        if removed > 0 {
            let lookup = &self.lookup;
            self.order.retain(|h| lookup.contains_key(h));
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.lookup.clear();
        self.order.clear();
    }

    /// Owned copies in arrival order.
    pub fn to_vec(&self) -> Vec<Transaction> {
        self.order
            .iter()
            .filter_map(|h| self.lookup.get(h))
            .map(|tx| Transaction::clone(tx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::PublicKey;

    fn tx(v: u64) -> Arc<Transaction> {
        Arc::new(Transaction::transfer(PublicKey([1; 32]), v))
    }

    #[test]
    fn keeps_arrival_order() {
        let mut m = TxSortedMap::new();
        let (a, b, c) = (tx(1), tx(2), tx(3));
        m.add(b.clone());
        m.add(a.clone());
        m.add(c.clone());
        let values: Vec<u64> = m.to_vec().iter().map(|t| t.value).collect();
        assert_eq!(values, vec![2, 1, 3]);
        assert_eq!(m.first().unwrap().value, 2);
    }

    #[test]
    fn duplicate_is_rejected() {
        let mut m = TxSortedMap::new();
        let a = tx(1);
        assert!(m.add(a.clone()));
        assert!(!m.add(a));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn pop_first_removes_oldest() {
        let mut m = TxSortedMap::new();
        let (a, b) = (tx(1), tx(2));
        m.add(a.clone());
        m.add(b.clone());
        assert_eq!(m.pop_first().unwrap().hash(), a.hash());
        assert!(!m.contains(&a.hash()));
        assert!(m.contains(&b.hash()));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn remove_all_keeps_order_of_the_rest() {
        let mut m = TxSortedMap::new();
        let (a, b, c) = (tx(1), tx(2), tx(3));
        m.add(a.clone());
        m.add(b.clone());
        m.add(c.clone());
        assert_eq!(m.remove_all(&[b.hash(), Hash::new([9; 32])]), 1);
        let values: Vec<u64> = m.to_vec().iter().map(|t| t.value).collect();
        assert_eq!(values, vec![1, 3]);
        assert_eq!(m.len(), 2);
        assert_eq!(m.pop_first().unwrap().hash(), a.hash());
    }

    #[test]
    fn clear_empties() {
        let mut m = TxSortedMap::new();
        m.add(tx(1));
        m.clear();
        assert!(m.is_empty());
        assert!(m.first().is_none());
    }
}
